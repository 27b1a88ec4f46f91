//! The broker is the topic-based status broadcast core.
//!
//! - `registry`: the shared topic → subscriber index and its fan-out.
//! - `publisher`: the handle job-execution code uses to announce transitions.
//! - `event`: the status payload delivered to clients.
//! - `topic`: a single job's subscriber set.

pub mod event;
pub mod publisher;
pub mod registry;
pub mod topic;

pub use event::{JobStatus, StatusEvent};
pub use publisher::Publisher;
pub use registry::TopicRegistry;
