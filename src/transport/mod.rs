//! The `transport` module connects clients to the broker.
//!
//! - `message`: the inbound JSON protocol.
//! - `connection`: the per-connection state machine (subscribe, snapshot
//!   reconciliation, disconnect cleanup).
//! - `websocket`: the accept loop and the read/write tasks that drive a
//!   `ConnectionHandler` over a WebSocket.

pub mod connection;
pub mod message;
pub mod websocket;

pub use connection::{ConnectionHandler, ConnectionState, DisconnectReason};
pub use message::ClientMessage;
pub use websocket::{handle_connection, serve};
