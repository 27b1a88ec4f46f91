//! # jobcast
//!
//! `jobcast` pushes background-job status to live WebSocket clients. A client
//! subscribes to one or more job ids and receives every status transition
//! published for them, plus an immediate snapshot of the last known status
//! so jobs that finished before the client arrived are not missed.
//!
//! ## Core Modules
//!
//! - `broker`: the topic registry, its fan-out, and the `Publisher` handle
//!   job-execution code uses to announce transitions.
//! - `client`: the registry's view of a connected client.
//! - `config`: loads server configuration from file and environment.
//! - `persistence`: the status store consulted for snapshots (sled or in-memory).
//! - `server`: `JobcastServer`, which wires everything from `Settings` for
//!   processes that embed the broadcaster next to their job code.
//! - `transport`: the WebSocket server and the per-connection state machine.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod persistence;
pub mod server;
pub mod transport;
pub mod utils;

pub use broker::{JobStatus, Publisher, StatusEvent, TopicRegistry};
pub use persistence::{StatusRecord, StatusSink, StatusStore};
pub use server::JobcastServer;
