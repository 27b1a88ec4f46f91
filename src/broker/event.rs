//! Status events fanned out to subscribers.
//!
//! A `StatusEvent` is both the live event produced by job code and the
//! snapshot sent on subscribe. On the wire it is:
//!
//! ```json
//! { "job_id": "job-42", "status": "success", "result": { "ok": 1 } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tungstenite::protocol::Message as WsMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Started,
    Success,
    Failure,
}

impl JobStatus {
    /// `true` once the job can no longer change status.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failure)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub result: Value,
}

impl StatusEvent {
    pub fn new(job_id: impl Into<String>, status: JobStatus, result: Value) -> Self {
        Self {
            job_id: job_id.into(),
            status,
            result,
        }
    }

    /// Encodes the event as a WebSocket text frame.
    pub fn to_ws_message(&self) -> Result<WsMessage, serde_json::Error> {
        serde_json::to_string(self).map(WsMessage::text)
    }
}
