//! Per-connection state machine.
//!
//! A `ConnectionHandler` walks `Connecting → Open → Closing → Closed` and
//! keeps a local mirror of the topics it holds in the registry. Inbound
//! frames are dispatched by `action`. A subscribe always triggers a status
//! lookup so that a job which finished before the client arrived is still
//! reported. Disconnect cleanup runs exactly once, including when the
//! handler is dropped without an explicit disconnect.

use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::broker::StatusEvent;
use crate::broker::TopicRegistry;
use crate::broker::topic::{SubscriberId, validate_topic};
use crate::client::Client;
use crate::persistence::StatusStore;
use crate::transport::message::ClientMessage;
use crate::utils::BroadcastError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The client sent a close frame or the stream ended.
    ClientClosed,
    /// Reading from the transport failed.
    Transport(String),
    /// Writing to the transport failed.
    SendFailed(String),
    /// The handler was dropped while still open.
    Dropped,
}

pub struct ConnectionHandler {
    id: SubscriberId,
    state: ConnectionState,
    topics: HashSet<String>,
    registry: Arc<TopicRegistry>,
    store: Arc<dyn StatusStore>,
    outbound: UnboundedSender<WsMessage>,
}

impl ConnectionHandler {
    /// `outbound` is the queue drained by this connection's writer task.
    pub fn new(
        registry: Arc<TopicRegistry>,
        store: Arc<dyn StatusStore>,
        outbound: UnboundedSender<WsMessage>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            state: ConnectionState::Connecting,
            topics: HashSet::new(),
            registry,
            store,
            outbound,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn topics(&self) -> &HashSet<String> {
        &self.topics
    }

    /// Registers with the registry and moves to `Open`.
    pub fn on_connect(&mut self) {
        if self.state != ConnectionState::Connecting {
            warn!(conn_id = %self.id, state = ?self.state, "on_connect called twice");
            return;
        }
        self.registry
            .register_client(Client::with_id(self.id.clone(), self.outbound.clone()));
        self.state = ConnectionState::Open;
        info!(conn_id = %self.id, "connection open");
    }

    /// Parses one inbound text frame and dispatches it.
    ///
    /// Malformed frames are logged and dropped; the connection stays open.
    pub async fn on_inbound(&mut self, text: &str) {
        if !self.is_open() {
            debug!(conn_id = %self.id, state = ?self.state, "inbound frame after close ignored");
            return;
        }

        let message = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => message,
            Err(err) => {
                let err = BroadcastError::from(err);
                warn!(
                    conn_id = %self.id,
                    error = %err,
                    frame = %text.chars().take(100).collect::<String>(),
                    "invalid client message"
                );
                return;
            }
        };

        match message {
            ClientMessage::Subscribe { job_id } => self.on_inbound_subscribe(job_id).await,
            ClientMessage::Unsubscribe { job_id } => self.on_inbound_unsubscribe(&job_id),
            ClientMessage::Unknown => {
                debug!(conn_id = %self.id, "unrecognized action ignored");
            }
        }
    }

    /// Subscribes to `job_id` and sends the store's snapshot, if any.
    pub async fn on_inbound_subscribe(&mut self, job_id: String) {
        if !self.is_open() {
            return;
        }
        if let Err(err) = validate_topic(&job_id) {
            warn!(conn_id = %self.id, error = %err, "rejected subscribe");
            return;
        }

        self.registry.subscribe(&self.id, &job_id);
        self.topics.insert(job_id.clone());
        debug!(conn_id = %self.id, job_id = %job_id, "subscribed");

        // Unconditional: the job may have finished before this subscribe.
        match self.store.get_status(&job_id).await {
            Ok(Some(record)) => {
                let snapshot = StatusEvent::from(record);
                self.on_published_event(&snapshot);
            }
            Ok(None) => {
                debug!(conn_id = %self.id, job_id = %job_id, "no status snapshot");
            }
            Err(err) => {
                let err = BroadcastError::from(err);
                warn!(conn_id = %self.id, job_id = %job_id, error = %err, "snapshot skipped");
            }
        }
    }

    pub fn on_inbound_unsubscribe(&mut self, job_id: &str) {
        if !self.is_open() {
            return;
        }
        self.registry.unsubscribe(&self.id, job_id);
        self.topics.remove(job_id);
        debug!(conn_id = %self.id, job_id = %job_id, "unsubscribed");
    }

    /// Forwards an event to this connection's transport unchanged.
    ///
    /// Registry fan-out writes straight into the same outbound queue; this is
    /// the path for events that originate in the handler itself, such as
    /// snapshots. A closed queue means the writer is gone, which is treated
    /// as a disconnect.
    pub fn on_published_event(&mut self, event: &StatusEvent) {
        if !self.is_open() {
            return;
        }
        let result = event
            .to_ws_message()
            .map_err(|e| BroadcastError::TransportSendFailure(e.to_string()))
            .and_then(|msg| {
                self.outbound
                    .send(msg)
                    .map_err(|_| BroadcastError::TransportSendFailure("outbound queue closed".into()))
            });

        if let Err(err) = result {
            warn!(conn_id = %self.id, job_id = %event.job_id, error = %err, "delivery failed");
            self.on_disconnect(DisconnectReason::SendFailed(err.to_string()));
        }
    }

    /// Removes every membership and moves to `Closed`. Later calls are no-ops.
    pub fn on_disconnect(&mut self, reason: DisconnectReason) {
        if matches!(self.state, ConnectionState::Closing | ConnectionState::Closed) {
            return;
        }
        self.state = ConnectionState::Closing;

        let registry = &self.registry;
        let id = &self.id;
        let removed = match catch_unwind(AssertUnwindSafe(|| registry.unsubscribe_all(id))) {
            Ok(removed) => Some(removed),
            Err(_) => {
                error!(conn_id = %self.id, "registry cleanup panicked");
                None
            }
        };

        match removed {
            Some(removed) if removed != self.topics.len() => warn!(
                conn_id = %self.id,
                removed,
                local = self.topics.len(),
                "registry and local topic sets disagreed at disconnect"
            ),
            _ => {}
        }

        self.topics.clear();
        self.state = ConnectionState::Closed;
        info!(conn_id = %self.id, reason = ?reason, "connection closed");
    }
}

impl Drop for ConnectionHandler {
    fn drop(&mut self) {
        if self.state == ConnectionState::Open {
            self.on_disconnect(DisconnectReason::Dropped);
        }
    }
}

impl std::fmt::Debug for ConnectionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandler")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("topics", &self.topics)
            .finish()
    }
}
