use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use super::{StatusRecord, StatusSink, StatusStore};
use crate::broker::JobStatus;
use crate::utils::StoreError;

/// In-process status store. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    records: RwLock<HashMap<String, StatusRecord>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, job_id: &str, status: JobStatus, result: Value) -> StatusRecord {
        let record = StatusRecord::new(job_id, status, result);
        self.insert(record.clone());
        record
    }

    fn insert(&self, record: StatusRecord) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.job_id.clone(), record);
    }
}

impl StatusSink for MemoryStatusStore {
    fn put(&self, record: &StatusRecord) -> Result<(), StoreError> {
        self.insert(record.clone());
        Ok(())
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn get_status(&self, job_id: &str) -> Result<Option<StatusRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_id)
            .cloned())
    }
}
