//! The `utils` module provides shared plumbing used across `jobcast`:
//! the error types every layer returns and the tracing bootstrap.

pub mod error;
pub mod logging;

pub use error::{BroadcastError, StoreError};
