//! Topic registry
//!
//! The registry owns the mapping from job id to the connections watching it,
//! plus a reverse index from connection to job ids. Responsibilities:
//! - adding and removing memberships (idempotently)
//! - dropping a topic as soon as its last subscriber leaves
//! - fanning a `StatusEvent` out to every current subscriber of its topic
//!
//! Concurrency and usage notes:
//! - Every operation takes the single internal mutex for its whole duration,
//!   so calls are atomic with respect to each other. Callers share the
//!   registry as `Arc<TopicRegistry>`.
//! - Fan-out pushes into each client's unbounded outbound queue while the
//!   lock is held. Those pushes never block, and holding the lock across
//!   them is what gives publish its snapshot cut and per-topic ordering.
//! - Nothing here awaits. Never hold the guard across network I/O.
//! - A poisoned lock is recovered. Each critical section only mutates
//!   the state in consistent steps, so a panic elsewhere cannot leave a
//!   half-applied membership behind.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, trace, warn};

use crate::broker::event::StatusEvent;
use crate::broker::topic::{SubscriberId, Topic};
use crate::client::Client;

#[derive(Debug, Default)]
pub(super) struct RegistryState {
    topics: HashMap<String, Topic>,
    clients: HashMap<SubscriberId, Client>,
}

#[derive(Debug, Default)]
pub struct TopicRegistry {
    state: Mutex<RegistryState>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a connection's outbound handle. Re-registering an id
    /// replaces the sender but keeps its memberships.
    pub fn register_client(&self, client: Client) {
        let mut state = self.state();
        match state.clients.entry(client.id.clone()) {
            Entry::Occupied(mut existing) => {
                warn!(conn_id = %client.id, "client re-registered, replacing sender");
                existing.get_mut().sender = client.sender;
            }
            Entry::Vacant(slot) => {
                debug!(conn_id = %client.id, "client registered");
                slot.insert(client);
            }
        }
    }

    /// Subscribes a connection to a topic, creating the topic if needed.
    ///
    /// Returns `true` if the membership is new. Unknown connections are
    /// ignored so that no topic ever references a missing client.
    pub fn subscribe(&self, connection_id: &str, topic: &str) -> bool {
        let mut state = self.state();
        let RegistryState { topics, clients } = &mut *state;

        let Some(client) = clients.get_mut(connection_id) else {
            warn!(conn_id = %connection_id, job_id = %topic, "subscribe from unregistered connection ignored");
            return false;
        };

        if !client.topics.insert(topic.to_string()) {
            trace!(conn_id = %connection_id, job_id = %topic, "already subscribed");
            return false;
        }

        topics
            .entry(topic.to_string())
            .or_insert_with(|| Topic::new(topic))
            .subscribe(connection_id.to_string());
        debug!(conn_id = %connection_id, job_id = %topic, "subscribed");
        true
    }

    /// Removes a single membership. The topic goes away with its last
    /// subscriber. Returns `true` if something was removed.
    pub fn unsubscribe(&self, connection_id: &str, topic: &str) -> bool {
        let mut state = self.state();
        let RegistryState { topics, clients } = &mut *state;

        let held = clients
            .get_mut(connection_id)
            .is_some_and(|client| client.topics.remove(topic));
        let listed = remove_member(topics, topic, connection_id);

        if held != listed {
            error!(conn_id = %connection_id, job_id = %topic, held, listed, "membership index was out of sync");
        }
        if held || listed {
            debug!(conn_id = %connection_id, job_id = %topic, "unsubscribed");
        }
        held || listed
    }

    /// Drops a connection from every topic and forgets its registration.
    ///
    /// Returns the number of memberships removed. Missing entries are
    /// skipped, so this always runs to completion.
    pub fn unsubscribe_all(&self, connection_id: &str) -> usize {
        let mut state = self.state();
        let RegistryState { topics, clients } = &mut *state;

        let Some(client) = clients.remove(connection_id) else {
            trace!(conn_id = %connection_id, "unsubscribe_all for unknown connection");
            return 0;
        };

        let removed = client
            .topics
            .iter()
            .filter(|topic| remove_member(topics, topic, connection_id))
            .count();

        debug!(
            conn_id = %connection_id,
            removed,
            connected_ms = chrono::Utc::now().timestamp_millis() - client.connected_at,
            "cleaned up client"
        );
        removed
    }

    /// Delivers `event` to every connection subscribed to its job id at the
    /// moment the lock is taken. Returns how many queues accepted it.
    ///
    /// A topic without subscribers is a silent no-op and is never created.
    pub fn publish(&self, event: &StatusEvent) -> usize {
        let state = self.state();

        let Some(topic) = state.topics.get(&event.job_id) else {
            trace!(job_id = %event.job_id, "publish with no subscribers");
            return 0;
        };

        let ws_msg = match event.to_ws_message() {
            Ok(msg) => msg,
            Err(e) => {
                error!(job_id = %event.job_id, error = %e, "failed to serialize status event");
                return 0;
            }
        };

        let mut delivered = 0;
        for sub_id in &topic.subscribers {
            match state.clients.get(sub_id) {
                Some(client) => {
                    if client.sender.send(ws_msg.clone()).is_ok() {
                        delivered += 1;
                    } else {
                        // The connection is tearing down and will unsubscribe itself.
                        debug!(conn_id = %sub_id, job_id = %event.job_id, "outbound queue closed");
                    }
                }
                None => {
                    error!(conn_id = %sub_id, job_id = %event.job_id, "subscriber has no registered client");
                }
            }
        }

        debug!(job_id = %event.job_id, status = ?event.status, delivered, "published");
        delivered
    }

    pub fn connection_count(&self) -> usize {
        self.state().clients.len()
    }

    pub fn topic_count(&self) -> usize {
        self.state().topics.len()
    }

    /// Current subscribers of `topic`, sorted.
    pub fn subscribers(&self, topic: &str) -> Vec<SubscriberId> {
        let mut subs: Vec<_> = self
            .state()
            .topics
            .get(topic)
            .map(|t| t.subscribers.iter().cloned().collect())
            .unwrap_or_default();
        subs.sort();
        subs
    }

    /// Topics held by `connection_id`, sorted.
    pub fn topics_of(&self, connection_id: &str) -> Vec<String> {
        let mut held: Vec<_> = self
            .state()
            .clients
            .get(connection_id)
            .map(|c| c.topics.iter().cloned().collect())
            .unwrap_or_default();
        held.sort();
        held
    }
}

/// Removes `connection_id` from `topic`, dropping the topic once empty.
fn remove_member(topics: &mut HashMap<String, Topic>, topic: &str, connection_id: &str) -> bool {
    let Some(t) = topics.get_mut(topic) else {
        return false;
    };
    let removed = t.unsubscribe(connection_id);
    if t.is_empty() {
        topics.remove(topic);
        trace!(job_id = %topic, "topic dropped");
    }
    removed
}
