//! Key-value store adapter.
//!
//! The result cache and the pre-warm scheduler only ever talk to a
//! [`KvStore`]. Two implementations exist:
//!
//! - [`MemoryStore`]: process-local, used in tests and single-node setups
//! - `RedisStore` (feature `redis`): the shared store used in production
//!
//! Values are strings, lists or sorted sets, mirroring the subset of Redis
//! the cache relies on. Using a key with the wrong value type is a
//! [`StorageError::WrongType`](hotquery_core::StorageError::WrongType).

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use hotquery_core::HotqueryResult;

pub mod memory;
pub mod pattern;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::MemoryStore;
pub use pattern::GlobPattern;
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;

/// Shared key-value store holding cached results, statistics, rankings and
/// the pre-warm queue.
///
/// Every operation is individually atomic; nothing spans more than one call.
#[async_trait]
pub trait KvStore: Send + Sync + Debug {
    // ------------------------------------------------------------------
    // String values
    // ------------------------------------------------------------------

    /// Read a string value. Expired and absent keys both return `None`.
    async fn get(&self, key: &str) -> HotqueryResult<Option<String>>;

    /// Write a string value, replacing whatever the key held.
    ///
    /// `ttl = None` stores the value without expiry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> HotqueryResult<()>;

    // ------------------------------------------------------------------
    // Keyspace
    // ------------------------------------------------------------------

    async fn exists(&self, key: &str) -> HotqueryResult<bool>;

    /// Delete one key of any type. Returns whether it existed.
    async fn delete(&self, key: &str) -> HotqueryResult<bool>;

    /// Delete several keys. Returns how many existed.
    async fn delete_many(&self, keys: &[String]) -> HotqueryResult<u64>;

    /// Enumerate keys matching a Redis-style glob pattern.
    async fn scan_keys(&self, pattern: &str) -> HotqueryResult<Vec<String>>;

    /// Number of live keys.
    async fn db_size(&self) -> HotqueryResult<u64>;

    /// Erase every key in the store.
    async fn flush_all(&self) -> HotqueryResult<()>;

    // ------------------------------------------------------------------
    // Lists
    // ------------------------------------------------------------------

    /// Push at the head of a list. Returns the new length.
    async fn list_push(&self, key: &str, value: &str) -> HotqueryResult<u64>;

    /// Pop from the tail of a list, i.e. the oldest pushed element.
    async fn list_pop(&self, key: &str) -> HotqueryResult<Option<String>>;

    async fn list_len(&self, key: &str) -> HotqueryResult<u64>;

    // ------------------------------------------------------------------
    // Sorted sets
    // ------------------------------------------------------------------

    /// Insert or update a member's score.
    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> HotqueryResult<()>;

    /// Up to `n` members with the highest scores, highest first.
    async fn sorted_set_top(&self, key: &str, n: usize) -> HotqueryResult<Vec<(String, f64)>>;

    async fn sorted_set_score(&self, key: &str, member: &str) -> HotqueryResult<Option<f64>>;
}
