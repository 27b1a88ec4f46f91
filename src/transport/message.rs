use serde::{Deserialize, Serialize};

/// Inbound client requests, keyed by `action`.
///
/// Actions this server does not know decode to `Unknown` and are ignored.
/// A known action without its `job_id` fails to decode.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientMessage {
    Subscribe { job_id: String },
    Unsubscribe { job_id: String },
    #[serde(other)]
    Unknown,
}
