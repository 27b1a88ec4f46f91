use std::collections::HashSet;

use crate::utils::BroadcastError;

pub type SubscriberId = String;

/// Longest job id accepted as a topic name.
pub const MAX_TOPIC_LEN: usize = 256;

/// A live topic: one job id and the connections currently watching it.
///
/// Topics only exist inside the registry while `subscribers` is non-empty.
#[derive(Debug, Default)]
pub struct Topic {
    pub name: String,
    pub subscribers: HashSet<SubscriberId>,
}

impl Topic {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: HashSet::new(),
        }
    }

    /// Returns `true` if the subscriber was not already present.
    pub fn subscribe(&mut self, id: SubscriberId) -> bool {
        self.subscribers.insert(id)
    }

    /// Returns `true` if the subscriber was present.
    pub fn unsubscribe(&mut self, id: &str) -> bool {
        self.subscribers.remove(id)
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

/// Checks that a client-supplied job id is usable as a topic name.
pub fn validate_topic(name: &str) -> Result<(), BroadcastError> {
    if name.trim().is_empty() {
        return Err(BroadcastError::MalformedInboundMessage(
            "job_id is empty".to_string(),
        ));
    }
    if name.len() > MAX_TOPIC_LEN {
        return Err(BroadcastError::MalformedInboundMessage(format!(
            "job_id longer than {MAX_TOPIC_LEN} bytes"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(BroadcastError::MalformedInboundMessage(
            "job_id contains control characters".to_string(),
        ));
    }
    Ok(())
}
