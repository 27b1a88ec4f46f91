//! Status store backed by `sled`
//!
//! Records live in a single `job_status` tree keyed by job id, serialized as
//! JSON. Each write replaces the previous record for that job.
//!
//! Configuration options supported:
//! - `ttl_seconds`: optional time-to-live for records, in whole seconds and
//!   strictly positive. Older records are reported as unknown and removed
//!   when read, unless a newer write replaced them in the meantime.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sled::{Db, IVec, Tree};
use tracing::debug;

use super::{StatusRecord, StatusSink, StatusStore};
use crate::broker::JobStatus;
use crate::utils::StoreError;

const STATUS_TREE: &str = "job_status";

#[derive(Clone)]
pub struct SledStatusStore {
    db: Db,
    pub(super) records: Tree,
    ttl_seconds: Option<i64>,
}

impl SledStatusStore {
    /// Open or create a sled database at `path`.
    ///
    /// Fails with [`StoreError::InvalidTtl`] if `ttl_seconds` is zero or
    /// negative.
    pub fn open(path: &str, ttl_seconds: Option<i64>) -> Result<Self, StoreError> {
        if let Some(ttl) = ttl_seconds.filter(|ttl| *ttl <= 0) {
            return Err(StoreError::InvalidTtl(ttl));
        }
        let db = sled::open(path)?;
        let records = db.open_tree(STATUS_TREE)?;
        Ok(Self {
            db,
            records,
            ttl_seconds,
        })
    }

    /// Store the latest status of a job, replacing any earlier record.
    pub fn record(
        &self,
        job_id: &str,
        status: JobStatus,
        result: Value,
    ) -> Result<StatusRecord, StoreError> {
        let record = StatusRecord::new(job_id, status, result);
        self.put(&record)?;
        Ok(record)
    }

    pub fn put(&self, record: &StatusRecord) -> Result<(), StoreError> {
        let serialized = serde_json::to_vec(record)?;
        self.records.insert(record.job_id.as_bytes(), serialized)?;
        Ok(())
    }

    /// Synchronous lookup used by the async trait method.
    pub fn load(&self, job_id: &str) -> Result<Option<StatusRecord>, StoreError> {
        let Some(raw) = self.records.get(job_id.as_bytes())? else {
            return Ok(None);
        };
        let record: StatusRecord = serde_json::from_slice(&raw)?;

        if self.is_expired(&record) {
            self.remove_if_unchanged(job_id, &raw)?;
            return Ok(None);
        }
        Ok(Some(record))
    }

    /// Deletes `job_id` only if it still holds `seen`. A record written
    /// after `seen` was read is left alone. Returns `true` if it deleted.
    pub(super) fn remove_if_unchanged(&self, job_id: &str, seen: &IVec) -> Result<bool, StoreError> {
        let swapped = self
            .records
            .compare_and_swap(job_id.as_bytes(), Some(seen), None::<&[u8]>)?;
        match swapped {
            Ok(()) => {
                debug!(job_id = %job_id, "dropped expired status record");
                Ok(true)
            }
            Err(_) => {
                debug!(job_id = %job_id, "expired status record was replaced before removal");
                Ok(false)
            }
        }
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    fn is_expired(&self, record: &StatusRecord) -> bool {
        let Some(ttl_ms) = self.ttl_seconds.and_then(|ttl| ttl.checked_mul(1000)) else {
            // No TTL, or one too large to ever elapse.
            return false;
        };
        Utc::now()
            .timestamp_millis()
            .saturating_sub(record.updated_at)
            > ttl_ms
    }
}

#[async_trait]
impl StatusStore for SledStatusStore {
    async fn get_status(&self, job_id: &str) -> Result<Option<StatusRecord>, StoreError> {
        self.load(job_id)
    }
}

impl StatusSink for SledStatusStore {
    fn put(&self, record: &StatusRecord) -> Result<(), StoreError> {
        SledStatusStore::put(self, record)
    }
}

impl std::fmt::Debug for SledStatusStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStatusStore")
            .field("db", &"sled::Db")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}
