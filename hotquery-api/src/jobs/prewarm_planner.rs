//! Pre-warm Planner
//!
//! Periodically runs the pre-warm selection and queues every eligible
//! candidate for the worker. The selection is the same dry-run plan the
//! admin interface reports.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use hotquery_core::{ConfigError, HotqueryError, HotqueryResult, PrewarmCriteria};
use hotquery_storage::PrewarmScheduler;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::constants::{DEFAULT_PLANNER_INTERVAL_SECS, MIN_TICK};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the pre-warm planner.
#[derive(Debug, Clone)]
pub struct PrewarmPlannerConfig {
    /// How often to plan and enqueue (default: 24 hours)
    pub interval: Duration,

    /// Eligibility thresholds
    pub criteria: PrewarmCriteria,
}

impl Default for PrewarmPlannerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_PLANNER_INTERVAL_SECS),
            criteria: PrewarmCriteria::default(),
        }
    }
}

impl PrewarmPlannerConfig {
    /// Create PrewarmPlannerConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `HOTQUERY_PLANNER_INTERVAL_SECS`: Planning interval (default: 86400)
    /// - `HOTQUERY_PLANNER_MIN_SCORE`: Score threshold (default: 15)
    /// - `HOTQUERY_PLANNER_MAX_PER_RUN`: Candidates queued per run (default: 20)
    pub fn from_env() -> Self {
        let defaults = PrewarmCriteria::default();

        let interval = Duration::from_secs(
            std::env::var("HOTQUERY_PLANNER_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PLANNER_INTERVAL_SECS),
        );

        let min_score = std::env::var("HOTQUERY_PLANNER_MIN_SCORE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.min_score);

        let max_per_run = std::env::var("HOTQUERY_PLANNER_MAX_PER_RUN")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_per_run);

        Self {
            interval,
            criteria: PrewarmCriteria {
                min_score,
                max_per_run,
                ..defaults
            },
        }
    }

    /// Validate the interval and the eligibility thresholds.
    pub fn validate(&self) -> HotqueryResult<()> {
        if self.interval.is_zero() {
            return Err(HotqueryError::Config(ConfigError::InvalidValue {
                field: "interval".to_string(),
                value: format!("{:?}", self.interval),
                reason: "planner interval must be greater than 0".to_string(),
            }));
        }
        self.criteria.validate()
    }
}

// ============================================================================
// METRICS
// ============================================================================

/// Counters for planner activity.
#[derive(Debug, Default)]
pub struct PrewarmPlannerMetrics {
    /// Planning runs completed
    pub runs: AtomicU64,

    /// Queries queued across all runs
    pub queries_queued: AtomicU64,

    /// Failed runs
    pub run_errors: AtomicU64,
}

impl PrewarmPlannerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PrewarmPlannerSnapshot {
        PrewarmPlannerSnapshot {
            runs: self.runs.load(Ordering::Relaxed),
            queries_queued: self.queries_queued.load(Ordering::Relaxed),
            run_errors: self.run_errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrewarmPlannerSnapshot {
    pub runs: u64,
    pub queries_queued: u64,
    pub run_errors: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Background task that plans and enqueues pre-warms until shutdown.
pub async fn prewarm_planner_task(
    scheduler: PrewarmScheduler,
    config: PrewarmPlannerConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<PrewarmPlannerMetrics> {
    let metrics = Arc::new(PrewarmPlannerMetrics::new());

    let mut plan_interval = interval(config.interval.max(MIN_TICK));
    plan_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        interval_secs = config.interval.as_secs(),
        min_score = config.criteria.min_score,
        max_per_run = config.criteria.max_per_run,
        "Pre-warm planner started"
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("Pre-warm planner shutting down");
                    break;
                }
            }

            _ = plan_interval.tick() => {
                metrics.runs.fetch_add(1, Ordering::Relaxed);
                match plan_and_enqueue_once(&scheduler, &config.criteria, Utc::now().date_naive()).await {
                    Ok(queued) => {
                        metrics.queries_queued.fetch_add(queued as u64, Ordering::Relaxed);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Pre-warm planning failed");
                        metrics.run_errors.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        runs = snapshot.runs,
        queries_queued = snapshot.queries_queued,
        run_errors = snapshot.run_errors,
        "Pre-warm planner completed"
    );

    metrics
}

/// Plan as of `today` and queue the selected candidates.
///
/// Returns the number of queries queued.
pub async fn plan_and_enqueue_once(
    scheduler: &PrewarmScheduler,
    criteria: &PrewarmCriteria,
    today: NaiveDate,
) -> HotqueryResult<usize> {
    let plan = scheduler.plan(criteria, today).await?;
    let keys = plan.candidate_keys();
    if keys.is_empty() {
        tracing::info!(excluded = plan.excluded.len(), "No pre-warm candidates this run");
        return Ok(0);
    }

    let queued = scheduler.request_prewarm(&keys).await?;
    tracing::info!(
        selected = keys.len(),
        queued = queued.len(),
        excluded = plan.excluded.len(),
        "Queued planned pre-warms"
    );
    Ok(queued.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = PrewarmPlannerConfig::default();
        assert_eq!(config.interval, Duration::from_secs(86400));
        assert_eq!(config.criteria, PrewarmCriteria::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = PrewarmPlannerConfig {
            interval: Duration::ZERO,
            ..PrewarmPlannerConfig::default()
        };
        let err = config.validate().expect_err("zero interval should fail");
        assert!(matches!(
            err,
            HotqueryError::Config(ConfigError::InvalidValue { ref field, .. }) if field == "interval"
        ));
    }

    #[test]
    fn test_validate_checks_criteria() {
        let config = PrewarmPlannerConfig {
            criteria: PrewarmCriteria {
                max_per_run: 0,
                ..PrewarmCriteria::default()
            },
            ..PrewarmPlannerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = PrewarmPlannerMetrics::new();
        metrics.runs.fetch_add(2, Ordering::Relaxed);
        metrics.queries_queued.fetch_add(7, Ordering::Relaxed);
        assert_eq!(
            metrics.snapshot(),
            PrewarmPlannerSnapshot {
                runs: 2,
                queries_queued: 7,
                run_errors: 0,
            }
        );
    }
}
