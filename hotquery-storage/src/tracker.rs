//! Execution tracking.
//!
//! Every query execution, hit or miss, updates three things in the store:
//! the query's statistics, its position in the pre-warm ranking, and a
//! short-lived log entry. The writes are separate store calls; a reader may
//! observe one without the others.

use std::time::Duration;

use hotquery_core::constants::QUERY_LOG_KEY_PREFIX;
use hotquery_core::{HotqueryConfig, HotqueryResult, QueryExecution, QueryStatsRecord, StorageError};

use crate::result_cache::ResultCache;
use crate::scheduler::PrewarmScheduler;

/// Records executions into statistics, ranking and the query log.
#[derive(Debug, Clone)]
pub struct QueryTracker {
    cache: ResultCache,
    scheduler: PrewarmScheduler,
    history_days: i64,
    log_retention: Duration,
}

impl QueryTracker {
    pub fn new(cache: ResultCache, scheduler: PrewarmScheduler, config: &HotqueryConfig) -> Self {
        Self {
            cache,
            scheduler,
            history_days: config.stats_history_days,
            log_retention: config.query_log_retention,
        }
    }

    /// Record one execution and return the updated statistics.
    ///
    /// The statistics write must succeed. Ranking and log writes are best
    /// effort: a failure there is logged and the updated record is still
    /// returned.
    pub async fn record(&self, execution: &QueryExecution) -> HotqueryResult<QueryStatsRecord> {
        let record = self
            .cache
            .record_execution(execution, self.history_days)
            .await?;

        if let Err(e) = self
            .scheduler
            .rank(&execution.query_hash, record.prewarm_score)
            .await
        {
            tracing::warn!(hash = %record.short_hash, error = %e, "Failed to update pre-warm ranking");
        }

        if let Err(e) = self.write_log(execution).await {
            tracing::warn!(hash = %record.short_hash, error = %e, "Failed to write query log entry");
        }

        tracing::info!(
            hash = %record.short_hash,
            status = ?execution.cache_status,
            score = record.prewarm_score,
            persistent = record.is_persistent,
            days_without_hits = record.consecutive_days_no_hits,
            "Recorded query execution"
        );
        Ok(record)
    }

    async fn write_log(&self, execution: &QueryExecution) -> HotqueryResult<()> {
        let key = log_key(execution);
        let raw = serde_json::to_string(execution).map_err(|e| StorageError::Serialization {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        self.cache
            .store()
            .set(&key, &raw, Some(self.log_retention))
            .await
    }
}

/// `query:log:{short}:{millis}`
pub fn log_key(execution: &QueryExecution) -> String {
    format!(
        "{}{}:{}",
        QUERY_LOG_KEY_PREFIX,
        execution.query_hash.short(),
        execution.timestamp.timestamp_millis()
    )
}

// =============================================================================
// TESTS
// =============================================================================
