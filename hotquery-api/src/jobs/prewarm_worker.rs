//! Pre-warm Queue Worker
//!
//! Drains `prewarm:queue`, executes each queued query against the warehouse
//! and stores the rows so the next reader gets a cache hit.
//!
//! Per item:
//!
//! - Empty results are skipped ("No data returned").
//! - Results larger than `max_result_bytes` are skipped.
//! - Persistent static queries are stored without a TTL; everything else
//!   gets the lifetime its cache strategy calls for.
//!
//! Failed items are counted and logged. The worker never re-queues them.
//!
//! # Configuration
//!
//! ```rust
//! use hotquery_api::jobs::PrewarmWorkerConfig;
//! use std::time::Duration;
//!
//! let config = PrewarmWorkerConfig {
//!     poll_interval: Duration::from_secs(30),
//!     batch_size: 20,
//!     pause_between_queries: Duration::from_secs(1),
//!     max_result_bytes: 5 * 1024 * 1024,
//! };
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hotquery_core::constants::DEFAULT_MAX_RESULT_BYTES;
use hotquery_core::{
    CacheStrategy, ConfigError, HotqueryError, HotqueryResult, PrewarmQueueItem, StorageError,
};
use hotquery_storage::{PrewarmScheduler, QueryExecutor, ResultCache};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::constants::{
    DEFAULT_WORKER_BATCH_SIZE, DEFAULT_WORKER_PAUSE_MS, DEFAULT_WORKER_POLL_INTERVAL_SECS, MIN_TICK,
};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the pre-warm worker.
#[derive(Debug, Clone)]
pub struct PrewarmWorkerConfig {
    /// How often to drain the queue (default: 30 seconds)
    pub poll_interval: Duration,

    /// Maximum items executed per drain (default: 20)
    pub batch_size: usize,

    /// Pause between consecutive warehouse queries (default: 1 second)
    pub pause_between_queries: Duration,

    /// Results above this serialized size are not cached (default: 5 MiB)
    pub max_result_bytes: usize,
}

impl Default for PrewarmWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_WORKER_POLL_INTERVAL_SECS),
            batch_size: DEFAULT_WORKER_BATCH_SIZE,
            pause_between_queries: Duration::from_millis(DEFAULT_WORKER_PAUSE_MS),
            max_result_bytes: DEFAULT_MAX_RESULT_BYTES,
        }
    }
}

impl PrewarmWorkerConfig {
    /// Create PrewarmWorkerConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `HOTQUERY_WORKER_POLL_INTERVAL_SECS`: Queue drain interval (default: 30)
    /// - `HOTQUERY_WORKER_BATCH_SIZE`: Items per drain (default: 20)
    /// - `HOTQUERY_WORKER_PAUSE_MS`: Pause between queries (default: 1000)
    /// - `HOTQUERY_MAX_RESULT_BYTES`: Largest cacheable result (default: 5 MiB)
    pub fn from_env() -> Self {
        let poll_interval = Duration::from_secs(
            std::env::var("HOTQUERY_WORKER_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_WORKER_POLL_INTERVAL_SECS),
        );

        let batch_size = std::env::var("HOTQUERY_WORKER_BATCH_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_WORKER_BATCH_SIZE);

        let pause_between_queries = Duration::from_millis(
            std::env::var("HOTQUERY_WORKER_PAUSE_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_WORKER_PAUSE_MS),
        );

        let max_result_bytes = std::env::var("HOTQUERY_MAX_RESULT_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_RESULT_BYTES);

        Self {
            poll_interval,
            batch_size,
            pause_between_queries,
            max_result_bytes,
        }
    }

    /// Reject settings that would stall or silently disable the worker.
    pub fn validate(&self) -> HotqueryResult<()> {
        let invalid = |field: &str, value: String, reason: &str| {
            Err(HotqueryError::Config(ConfigError::InvalidValue {
                field: field.to_string(),
                value,
                reason: reason.to_string(),
            }))
        };
        if self.poll_interval.is_zero() {
            return invalid(
                "poll_interval",
                format!("{:?}", self.poll_interval),
                "poll interval must be greater than 0",
            );
        }
        if self.batch_size == 0 {
            return invalid("batch_size", "0".to_string(), "batch size must be greater than 0");
        }
        if self.max_result_bytes == 0 {
            return invalid(
                "max_result_bytes",
                "0".to_string(),
                "max_result_bytes must be greater than 0",
            );
        }
        Ok(())
    }
}

// ============================================================================
// DEPENDENCIES
// ============================================================================

/// What the worker needs to run.
#[derive(Clone)]
pub struct PrewarmWorkerDeps {
    pub scheduler: PrewarmScheduler,
    pub cache: ResultCache,
    pub executor: Arc<dyn QueryExecutor>,
}

// ============================================================================
// METRICS
// ============================================================================

/// Counters for pre-warm worker activity.
#[derive(Debug, Default)]
pub struct PrewarmWorkerMetrics {
    /// Queries executed and cached
    pub items_warmed: AtomicU64,

    /// Queries executed but not cached (empty or oversized)
    pub items_skipped: AtomicU64,

    /// Queries whose execution or cache write failed
    pub items_failed: AtomicU64,

    /// Drain cycles completed
    pub drain_cycles: AtomicU64,

    /// Queue read failures
    pub queue_errors: AtomicU64,
}

impl PrewarmWorkerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PrewarmWorkerSnapshot {
        PrewarmWorkerSnapshot {
            items_warmed: self.items_warmed.load(Ordering::Relaxed),
            items_skipped: self.items_skipped.load(Ordering::Relaxed),
            items_failed: self.items_failed.load(Ordering::Relaxed),
            drain_cycles: self.drain_cycles.load(Ordering::Relaxed),
            queue_errors: self.queue_errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of worker metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrewarmWorkerSnapshot {
    pub items_warmed: u64,
    pub items_skipped: u64,
    pub items_failed: u64,
    pub drain_cycles: u64,
    pub queue_errors: u64,
}

// ============================================================================
// PER-ITEM OUTCOME
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrewarmItemStatus {
    Success,
    Skipped,
    Failed,
}

/// What happened to one queue item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrewarmOutcome {
    /// Short display hash.
    pub hash: String,
    pub status: PrewarmItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub row_count: usize,
    pub bytes: usize,
    pub persistent: bool,
}

impl PrewarmOutcome {
    fn new(item: &PrewarmQueueItem, status: PrewarmItemStatus) -> Self {
        Self {
            hash: item.short_hash().to_string(),
            status,
            reason: None,
            row_count: 0,
            bytes: 0,
            persistent: false,
        }
    }

    fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Background task that drains the pre-warm queue until shutdown.
///
/// ```ignore
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
/// let handle = tokio::spawn(prewarm_worker_task(deps, config, shutdown_rx));
///
/// let _ = shutdown_tx.send(true);
/// let metrics = handle.await?;
/// ```
pub async fn prewarm_worker_task(
    deps: PrewarmWorkerDeps,
    config: PrewarmWorkerConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<PrewarmWorkerMetrics> {
    let metrics = Arc::new(PrewarmWorkerMetrics::new());

    let mut drain_interval = interval(config.poll_interval.max(MIN_TICK));
    drain_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        poll_interval_secs = config.poll_interval.as_secs(),
        batch_size = config.batch_size,
        max_result_bytes = config.max_result_bytes,
        "Pre-warm worker started"
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("Pre-warm worker shutting down");
                    break;
                }
            }

            _ = drain_interval.tick() => {
                drain_queue_once(&deps, &config, &metrics).await;
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        items_warmed = snapshot.items_warmed,
        items_skipped = snapshot.items_skipped,
        items_failed = snapshot.items_failed,
        drain_cycles = snapshot.drain_cycles,
        queue_errors = snapshot.queue_errors,
        "Pre-warm worker completed"
    );

    metrics
}

/// Execute up to `batch_size` queued items, oldest first.
pub async fn drain_queue_once(
    deps: &PrewarmWorkerDeps,
    config: &PrewarmWorkerConfig,
    metrics: &PrewarmWorkerMetrics,
) -> Vec<PrewarmOutcome> {
    metrics.drain_cycles.fetch_add(1, Ordering::Relaxed);
    let mut outcomes = Vec::new();

    while outcomes.len() < config.batch_size {
        let item = match deps.scheduler.dequeue().await {
            Ok(Some(item)) => item,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read pre-warm queue");
                metrics.queue_errors.fetch_add(1, Ordering::Relaxed);
                break;
            }
        };

        if !outcomes.is_empty() && !config.pause_between_queries.is_zero() {
            tokio::time::sleep(config.pause_between_queries).await;
        }

        let outcome = match warm_item(deps, config, &item).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(hash = %item.short_hash(), error = %e, "Pre-warm failed");
                PrewarmOutcome::new(&item, PrewarmItemStatus::Failed).with_reason(e.to_string())
            }
        };

        let counter = match outcome.status {
            PrewarmItemStatus::Success => &metrics.items_warmed,
            PrewarmItemStatus::Skipped => &metrics.items_skipped,
            PrewarmItemStatus::Failed => &metrics.items_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        outcomes.push(outcome);
    }

    if outcomes.is_empty() {
        tracing::trace!("Pre-warm queue empty");
    } else {
        tracing::info!(processed = outcomes.len(), "Pre-warm drain cycle completed");
    }
    outcomes
}

async fn warm_item(
    deps: &PrewarmWorkerDeps,
    config: &PrewarmWorkerConfig,
    item: &PrewarmQueueItem,
) -> HotqueryResult<PrewarmOutcome> {
    let stats = deps.cache.get(&item.query_hash).await?;
    let persistent = stats.as_ref().map(|s| s.is_persistent).unwrap_or(false);

    let rows = deps.executor.execute(&item.sql).await?;
    if rows.is_empty() {
        tracing::info!(hash = %item.short_hash(), "Pre-warm skipped, no data returned");
        return Ok(PrewarmOutcome::new(item, PrewarmItemStatus::Skipped).with_reason("No data returned"));
    }

    let bytes = serde_json::to_vec(&rows)
        .map_err(|e| StorageError::Serialization {
            key: item.query_hash.to_string(),
            reason: e.to_string(),
        })?
        .len();
    if bytes > config.max_result_bytes {
        let reason = format!("Dataset too large ({:.2}MB)", bytes as f64 / 1024.0 / 1024.0);
        tracing::warn!(hash = %item.short_hash(), bytes, "Pre-warm skipped, result too large");
        let mut outcome = PrewarmOutcome::new(item, PrewarmItemStatus::Skipped).with_reason(reason);
        outcome.row_count = rows.len();
        outcome.bytes = bytes;
        return Ok(outcome);
    }

    let strategy = CacheStrategy::classify(&item.sql, false);
    let ttl = deps.cache.ttl_for(strategy, stats.as_ref(), false);
    let written = deps.cache.put_result(&item.query_hash, &rows, ttl).await?;

    tracing::info!(
        hash = %item.short_hash(),
        rows = rows.len(),
        bytes = written,
        persistent,
        ttl_secs = ttl.map(|t| t.as_secs()),
        "Pre-warmed query"
    );

    let mut outcome = PrewarmOutcome::new(item, PrewarmItemStatus::Success);
    outcome.row_count = rows.len();
    outcome.bytes = written;
    outcome.persistent = persistent;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = PrewarmWorkerConfig::default();
        assert_eq!(
            config.poll_interval,
            Duration::from_secs(DEFAULT_WORKER_POLL_INTERVAL_SECS)
        );
        assert_eq!(config.batch_size, DEFAULT_WORKER_BATCH_SIZE);
        assert_eq!(config.pause_between_queries, Duration::from_secs(1));
        assert_eq!(config.max_result_bytes, 5 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_settings() {
        let cases = [
            (
                "poll_interval",
                PrewarmWorkerConfig {
                    poll_interval: Duration::ZERO,
                    ..PrewarmWorkerConfig::default()
                },
            ),
            (
                "batch_size",
                PrewarmWorkerConfig {
                    batch_size: 0,
                    ..PrewarmWorkerConfig::default()
                },
            ),
            (
                "max_result_bytes",
                PrewarmWorkerConfig {
                    max_result_bytes: 0,
                    ..PrewarmWorkerConfig::default()
                },
            ),
        ];
        for (expected, config) in cases {
            match config.validate() {
                Err(HotqueryError::Config(ConfigError::InvalidValue { field, .. })) => {
                    assert_eq!(field, expected)
                }
                other => panic!("expected {} to be rejected, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = PrewarmWorkerMetrics::new();
        metrics.items_warmed.fetch_add(3, Ordering::Relaxed);
        metrics.items_failed.fetch_add(1, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.items_warmed, 3);
        assert_eq!(snapshot.items_skipped, 0);
        assert_eq!(snapshot.items_failed, 1);
    }

    #[test]
    fn test_outcome_wire_format() {
        let outcome = PrewarmOutcome {
            hash: "abcd1234".to_string(),
            status: PrewarmItemStatus::Skipped,
            reason: Some("No data returned".to_string()),
            row_count: 0,
            bytes: 0,
            persistent: false,
        };
        let value = serde_json::to_value(&outcome).expect("serialize should succeed");
        assert_eq!(value["status"], "skipped");
        assert_eq!(value["rowCount"], 0);
        assert_eq!(value["reason"], "No data returned");
    }
}
