//! Embeddable status server
//!
//! `JobcastServer` builds the registry and the configured status store from
//! `Settings` and runs the WebSocket accept loop. Job-execution code that
//! embeds it takes a `Publisher` from [`JobcastServer::publisher`]: every
//! event published through it is recorded in the store and fanned out to
//! live subscribers.
//!
//! The sled backend holds an exclusive lock on its database, so producers
//! must live in the same process as the server.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::broker::{Publisher, TopicRegistry};
use crate::config::{Settings, StoreBackend};
use crate::persistence::{MemoryStatusStore, SledStatusStore, StatusSink, StatusStore};
use crate::transport::serve;
use crate::utils::{BroadcastError, StoreError};

pub struct JobcastServer {
    settings: Settings,
    registry: Arc<TopicRegistry>,
    store: Arc<dyn StatusStore>,
    sink: Arc<dyn StatusSink>,
    sled: Option<SledStatusStore>,
}

impl JobcastServer {
    /// Opens the configured store. Nothing is bound until [`start`](Self::start).
    pub fn new(settings: Settings) -> Result<Self, StoreError> {
        let (store, sink, sled): (Arc<dyn StatusStore>, Arc<dyn StatusSink>, _) =
            match settings.store.backend {
                StoreBackend::Sled => {
                    let sled =
                        SledStatusStore::open(&settings.store.path, settings.store.record_ttl_secs)?;
                    (Arc::new(sled.clone()), Arc::new(sled.clone()), Some(sled))
                }
                StoreBackend::Memory => {
                    warn!("using in-memory status store; snapshots will not survive a restart");
                    let memory = Arc::new(MemoryStatusStore::new());
                    (memory.clone(), memory, None)
                }
            };

        Ok(Self {
            settings,
            registry: Arc::new(TopicRegistry::new()),
            store,
            sink,
            sled,
        })
    }

    pub fn registry(&self) -> Arc<TopicRegistry> {
        self.registry.clone()
    }

    pub fn store(&self) -> Arc<dyn StatusStore> {
        self.store.clone()
    }

    /// A publisher that records each event before broadcasting it.
    pub fn publisher(&self) -> Publisher {
        Publisher::recording(self.registry.clone(), self.sink.clone())
    }

    /// Binds the configured address and spawns the accept loop.
    ///
    /// Returns the bound address (useful with port 0) and the loop's task.
    pub async fn start(&self) -> Result<(SocketAddr, JoinHandle<()>), BroadcastError> {
        let addr = format!("{}:{}", self.settings.server.host, self.settings.server.port);
        let listener = TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;
        info!("WebSocket server listening on ws://{}", local_addr);

        let task = tokio::spawn(serve(
            listener,
            self.registry.clone(),
            self.store.clone(),
            self.settings.broker.max_connections,
        ));
        Ok((local_addr, task))
    }

    /// Flushes the sled database, if that is the backend in use.
    pub fn flush(&self) -> Result<(), StoreError> {
        match &self.sled {
            Some(sled) => sled.flush(),
            None => Ok(()),
        }
    }
}
