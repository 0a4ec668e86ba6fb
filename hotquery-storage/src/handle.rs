//! Store connection lifecycle.
//!
//! A [`StoreHandle`] owns the single shared store connection of a process.
//! It is created explicitly at startup and passed to the components that
//! need it; the connection itself is opened lazily on first use and at most
//! once, no matter how many callers race for it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use hotquery_core::HotqueryResult;
use tokio::sync::Mutex;

use crate::store::{KvStore, MemoryStore};

/// Opens a connection to a concrete store.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> HotqueryResult<Arc<dyn KvStore>>;

    /// Human-readable target for logs.
    fn describe(&self) -> String;
}

/// Connector producing a fresh [`MemoryStore`] per connection.
#[derive(Debug, Default, Clone)]
pub struct MemoryConnector;

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn connect(&self) -> HotqueryResult<Arc<dyn KvStore>> {
        Ok(Arc::new(MemoryStore::new()))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Connector for a Redis server.
#[cfg(feature = "redis")]
#[derive(Debug, Clone)]
pub struct RedisConnector {
    url: String,
}

#[cfg(feature = "redis")]
impl RedisConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[cfg(feature = "redis")]
#[async_trait]
impl StoreConnector for RedisConnector {
    async fn connect(&self) -> HotqueryResult<Arc<dyn KvStore>> {
        let store = crate::store::RedisStore::connect(&self.url).await?;
        Ok(Arc::new(store))
    }

    fn describe(&self) -> String {
        "redis".to_string()
    }
}

/// Single-flight owner of the shared store connection.
///
/// Concurrent callers of [`open`](Self::open) serialize on one async mutex:
/// the first performs the connection, the rest wait for it and reuse the
/// result. A failed connection attempt leaves the handle closed so the next
/// caller retries.
pub struct StoreHandle {
    connector: Box<dyn StoreConnector>,
    store: Mutex<Option<Arc<dyn KvStore>>>,
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("connector", &self.connector.describe())
            .finish_non_exhaustive()
    }
}

impl StoreHandle {
    pub fn new(connector: impl StoreConnector + 'static) -> Self {
        Self {
            connector: Box::new(connector),
            store: Mutex::new(None),
        }
    }

    /// Handle over a process-local in-memory store.
    pub fn memory() -> Self {
        Self::new(MemoryConnector)
    }

    /// Handle wrapping an already-connected store.
    pub fn from_store(store: Arc<dyn KvStore>) -> Self {
        Self {
            connector: Box::new(MemoryConnector),
            store: Mutex::new(Some(store)),
        }
    }

    /// Connect if not yet connected. Idempotent.
    pub async fn open(&self) -> HotqueryResult<()> {
        self.store().await.map(|_| ())
    }

    /// The shared store, connecting on first use.
    pub async fn store(&self) -> HotqueryResult<Arc<dyn KvStore>> {
        let mut guard = self.store.lock().await;
        if let Some(store) = guard.as_ref() {
            return Ok(Arc::clone(store));
        }

        let target = self.connector.describe();
        tracing::debug!(target_store = %target, "Opening store connection");
        match self.connector.connect().await {
            Ok(store) => {
                tracing::info!(target_store = %target, "Store connection opened");
                *guard = Some(Arc::clone(&store));
                Ok(store)
            }
            Err(e) => {
                tracing::error!(target_store = %target, error = %e, "Store connection failed");
                Err(e)
            }
        }
    }

    /// Drop the connection; a later call to [`store`](Self::store) reconnects.
    pub async fn close(&self) {
        if self.store.lock().await.take().is_some() {
            tracing::info!(target_store = %self.connector.describe(), "Store connection closed");
        }
    }

    pub async fn is_open(&self) -> bool {
        self.store.lock().await.is_some()
    }
}

// =============================================================================
// TESTS
// =============================================================================
