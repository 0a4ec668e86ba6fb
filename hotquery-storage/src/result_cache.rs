//! Result cache.
//!
//! Two kinds of entries live under a query's [`CacheKey`]:
//!
//! - the cached rows, a JSON array stored at the raw hash
//! - the usage statistics, a [`QueryStatsRecord`] at `query:stats:{hash}`
//!
//! Writes are last-writer-wins. A payload that no longer decodes is logged
//! and treated as absent rather than failing the read.

use std::sync::Arc;
use std::time::Duration;

use hotquery_core::{
    CacheKey, CacheStrategy, HotqueryConfig, HotqueryResult, QueryExecution, QueryStatsRecord,
    StorageError,
};
use serde_json::Value;

use crate::store::KvStore;

/// Rows of one query result.
pub type Rows = Vec<Value>;

/// Cached query results and their statistics over a shared store.
#[derive(Debug, Clone)]
pub struct ResultCache {
    store: Arc<dyn KvStore>,
    default_ttl: Duration,
    empty_ttl: Duration,
}

impl ResultCache {
    pub fn new(store: Arc<dyn KvStore>, config: &HotqueryConfig) -> Self {
        Self {
            store,
            default_ttl: config.default_result_ttl,
            empty_ttl: config.empty_result_ttl,
        }
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    // ========================================================================
    // STATISTICS
    // ========================================================================

    /// Statistics recorded for `key`, if any.
    pub async fn get(&self, key: &CacheKey) -> HotqueryResult<Option<QueryStatsRecord>> {
        let stats_key = key.stats_key();
        let Some(raw) = self.store.get(&stats_key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!(key = %stats_key, error = %e, "Undecodable stats record treated as miss");
                Ok(None)
            }
        }
    }

    /// Store statistics for `key`, replacing any previous record.
    pub async fn put(&self, key: &CacheKey, record: &QueryStatsRecord) -> HotqueryResult<()> {
        let stats_key = key.stats_key();
        let raw = serde_json::to_string(record).map_err(|e| StorageError::Serialization {
            key: stats_key.clone(),
            reason: e.to_string(),
        })?;
        self.store.set(&stats_key, &raw, None).await
    }

    /// Fold one execution into the statistics of its query and store the
    /// result.
    ///
    /// This is a plain read-modify-write; concurrent executions of the same
    /// query may lose an increment.
    pub async fn record_execution(
        &self,
        execution: &QueryExecution,
        history_days: i64,
    ) -> HotqueryResult<QueryStatsRecord> {
        let key = &execution.query_hash;
        let mut record = match self.get(key).await? {
            Some(record) => record,
            None => QueryStatsRecord::new(key.clone(), execution.sql.clone(), execution.timestamp),
        };
        record.apply_execution(execution, history_days);
        self.put(key, &record).await?;
        Ok(record)
    }

    // ========================================================================
    // CACHED ROWS
    // ========================================================================

    /// Cached rows for `key`, if any.
    pub async fn get_result(&self, key: &CacheKey) -> HotqueryResult<Option<Rows>> {
        let Some(raw) = self.store.get(key.as_str()).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(rows) => Ok(Some(rows)),
            Err(e) => {
                tracing::warn!(hash = %key.short(), error = %e, "Undecodable cached result treated as miss");
                Ok(None)
            }
        }
    }

    /// Cache rows for `key`. `ttl = None` keeps them until deleted.
    ///
    /// Returns the size of the stored payload in bytes.
    pub async fn put_result(
        &self,
        key: &CacheKey,
        rows: &[Value],
        ttl: Option<Duration>,
    ) -> HotqueryResult<usize> {
        let raw = encode_rows(key, rows)?;
        self.store.set(key.as_str(), &raw, ttl).await?;
        tracing::debug!(
            hash = %key.short(),
            rows = rows.len(),
            bytes = raw.len(),
            ttl_secs = ttl.map(|t| t.as_secs()),
            "Cached query result"
        );
        Ok(raw.len())
    }

    /// Lifetime for a freshly computed result.
    ///
    /// Empty results always get the short empty-result TTL. Static queries
    /// whose statistics mark them persistent never expire.
    pub fn ttl_for(
        &self,
        strategy: CacheStrategy,
        stats: Option<&QueryStatsRecord>,
        is_empty: bool,
    ) -> Option<Duration> {
        if is_empty {
            return Some(self.empty_ttl);
        }
        match strategy.fixed_ttl() {
            Some(ttl) => Some(ttl),
            None if stats.map(|s| s.is_persistent).unwrap_or(false) => None,
            None => Some(self.default_ttl),
        }
    }

    // ========================================================================
    // INVALIDATION
    // ========================================================================

    /// Delete the cached rows of one query. Returns whether anything existed.
    pub async fn delete_by_key(&self, key: &CacheKey) -> HotqueryResult<bool> {
        self.delete_entry(key.as_str()).await
    }

    /// Delete a caller-supplied key exactly as given.
    ///
    /// Used for hashes that did not come from [`compute_cache_key`](hotquery_core::compute_cache_key).
    pub async fn delete_entry(&self, key: &str) -> HotqueryResult<bool> {
        let deleted = self.store.delete(key).await?;
        tracing::info!(key, deleted, "Cache entry delete");
        Ok(deleted)
    }

    /// Delete every key matching a glob pattern. Zero matches is not an error.
    pub async fn delete_by_pattern(&self, pattern: &str) -> HotqueryResult<u64> {
        let keys = self.store.scan_keys(pattern).await?;
        if keys.is_empty() {
            tracing::info!(pattern, "No keys matched pattern");
            return Ok(0);
        }
        let deleted = self.store.delete_many(&keys).await?;
        tracing::info!(pattern, deleted, "Cleared keys by pattern");
        Ok(deleted)
    }

    /// Erase the whole store, including statistics, rankings and the queue.
    ///
    /// Returns the number of keys that existed beforehand.
    pub async fn flush_all(&self) -> HotqueryResult<u64> {
        let before = self.store.db_size().await?;
        self.store.flush_all().await?;
        tracing::warn!(keys_deleted = before, "Flushed entire store");
        Ok(before)
    }
}

fn encode_rows(key: &CacheKey, rows: &[Value]) -> HotqueryResult<String> {
    serde_json::to_string(rows).map_err(|e| {
        StorageError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

// =============================================================================
// TESTS
// =============================================================================
