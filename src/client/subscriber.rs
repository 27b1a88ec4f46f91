use std::collections::HashSet;

use tokio::sync::mpsc::UnboundedSender;
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::broker::topic::SubscriberId;

/// The registry's view of a connected client.
///
/// `sender` feeds the connection's writer task. `topics` is the registry-side
/// reverse index and always mirrors the subscriber sets of the live topics.
#[derive(Debug)]
pub struct Client {
    pub id: SubscriberId,
    pub sender: UnboundedSender<WsMessage>,
    pub topics: HashSet<String>,
    /// Milliseconds since the UNIX epoch.
    pub connected_at: i64,
}

impl Client {
    /// Create a client with a fresh UUID.
    pub fn new(sender: UnboundedSender<WsMessage>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), sender)
    }

    pub fn with_id(id: impl Into<SubscriberId>, sender: UnboundedSender<WsMessage>) -> Self {
        Self {
            id: id.into(),
            sender,
            topics: HashSet::new(),
            connected_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}
