//! The `persistence` module is the status store adapter.
//!
//! The broadcast core only ever reads from it: every subscribe asks the
//! store for the last known status of a job so that late subscribers still
//! see jobs that finished before they arrived. Writes come from
//! job-execution code, either through a recording `Publisher` or directly
//! through `StatusSink`.
//!
//! Two stores ship with the crate: `sled_store` for a durable embedded
//! database, and `memory_store` for tests and throwaway deployments.

pub mod memory_store;
pub mod sled_store;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::broker::{JobStatus, StatusEvent};
use crate::utils::StoreError;

pub use memory_store::MemoryStatusStore;
pub use sled_store::SledStatusStore;

/// The last known status of a job, as held by a store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StatusRecord {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub result: Value,
    /// Milliseconds since the UNIX epoch.
    pub updated_at: i64,
}

impl StatusRecord {
    pub fn new(job_id: impl Into<String>, status: JobStatus, result: Value) -> Self {
        Self {
            job_id: job_id.into(),
            status,
            result,
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

impl From<StatusRecord> for StatusEvent {
    fn from(record: StatusRecord) -> Self {
        StatusEvent::new(record.job_id, record.status, record.result)
    }
}

/// Read side of a job-status store.
///
/// Implementations must answer promptly: the lookup sits on the subscribe
/// path of every connection.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Returns `Ok(None)` for a job the store has never heard of.
    async fn get_status(&self, job_id: &str) -> Result<Option<StatusRecord>, StoreError>;
}

/// Write side of a job-status store. Each call replaces the job's record.
pub trait StatusSink: Send + Sync + std::fmt::Debug {
    fn put(&self, record: &StatusRecord) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests;
