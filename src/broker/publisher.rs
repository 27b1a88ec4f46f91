use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::broker::event::{JobStatus, StatusEvent};
use crate::broker::registry::TopicRegistry;
use crate::persistence::{StatusRecord, StatusSink};

/// Handle that job-execution code uses to announce status transitions.
///
/// `publish` is synchronous and never waits on network I/O, so it can be
/// called from async tasks and plain OS threads alike. Delivery is
/// fire-and-forget: nobody listening means nothing happens.
///
/// A publisher built with [`Publisher::recording`] also writes each event to
/// a status store before fanning it out, so clients that subscribe later
/// get it as their snapshot.
#[derive(Debug, Clone)]
pub struct Publisher {
    registry: Arc<TopicRegistry>,
    sink: Option<Arc<dyn StatusSink>>,
}

impl Publisher {
    pub fn new(registry: Arc<TopicRegistry>) -> Self {
        Self {
            registry,
            sink: None,
        }
    }

    pub fn recording(registry: Arc<TopicRegistry>, sink: Arc<dyn StatusSink>) -> Self {
        Self {
            registry,
            sink: Some(sink),
        }
    }

    pub fn publish(&self, job_id: &str, status: JobStatus, result: Value) {
        self.publish_event(&StatusEvent::new(job_id, status, result));
    }

    pub fn publish_event(&self, event: &StatusEvent) {
        // Record first: a subscriber arriving after the fan-out must find it.
        if let Some(sink) = &self.sink {
            let record = StatusRecord::new(event.job_id.clone(), event.status, event.result.clone());
            if let Err(e) = sink.put(&record) {
                warn!(job_id = %event.job_id, error = %e, "failed to record status");
            }
        }

        let delivered = self.registry.publish(event);
        if event.status.is_terminal() {
            info!(job_id = %event.job_id, status = ?event.status, delivered, "job finished");
        }
    }
}
