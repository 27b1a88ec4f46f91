//! Error types for `jobcast`.
//!
//! Every fault here is scoped to a single connection or a single store
//! lookup. Nothing in this module is allowed to escape into the registry.

/// Errors raised by a connection handler or the server loop.
#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    /// The inbound frame was not valid JSON or lacked a required field.
    #[error("malformed inbound message: {0}")]
    MalformedInboundMessage(String),

    /// Writing to the connection's transport failed.
    #[error("transport send failed: {0}")]
    TransportSendFailure(String),

    /// The status store could not answer a snapshot lookup.
    #[error("status lookup failed: {0}")]
    StatusLookupFailure(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for BroadcastError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedInboundMessage(err.to_string())
    }
}

impl From<tungstenite::Error> for BroadcastError {
    fn from(err: tungstenite::Error) -> Self {
        Self::TransportSendFailure(err.to_string())
    }
}

/// Errors raised by a [`crate::persistence::StatusStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("record codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A record TTL must be a positive number of seconds.
    #[error("invalid record ttl: {0}s")]
    InvalidTtl(i64),
}
