//! The `client` module defines how the registry sees a connected client:
//! an id, the sending side of its outbound queue, and the topics it holds.

pub mod subscriber;
pub use subscriber::Client;

#[cfg(test)]
mod tests;
