//! Configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MAX_RESULT_BYTES, DEFAULT_RESULT_TTL_SECS, DEFAULT_STATS_HISTORY_DAYS,
    EMPTY_RESULT_TTL_SECS, QUERY_LOG_RETENTION_SECS,
};
use crate::error::{ConfigError, HotqueryError, HotqueryResult};

/// Default Redis connection URL.
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Cache-wide settings shared by the storage layer and the jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotqueryConfig {
    /// Connection URL of the shared key-value store.
    pub redis_url: String,

    /// Days of per-day hit history kept on stats records.
    pub stats_history_days: i64,

    /// How long query log entries are retained.
    pub query_log_retention: Duration,

    /// TTL for non-persistent cached results.
    pub default_result_ttl: Duration,

    /// TTL for cached empty result sets.
    pub empty_result_ttl: Duration,

    /// Largest serialized result the pre-warm worker will cache.
    pub max_result_bytes: usize,
}

impl Default for HotqueryConfig {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            stats_history_days: DEFAULT_STATS_HISTORY_DAYS,
            query_log_retention: Duration::from_secs(QUERY_LOG_RETENTION_SECS),
            default_result_ttl: Duration::from_secs(DEFAULT_RESULT_TTL_SECS),
            empty_result_ttl: Duration::from_secs(EMPTY_RESULT_TTL_SECS),
            max_result_bytes: DEFAULT_MAX_RESULT_BYTES,
        }
    }
}

impl HotqueryConfig {
    /// Create HotqueryConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `HOTQUERY_REDIS_URL`: Store connection URL (default: redis://127.0.0.1:6379)
    /// - `HOTQUERY_STATS_HISTORY_DAYS`: Days of hit history kept (default: 14)
    /// - `HOTQUERY_QUERY_LOG_RETENTION_SECS`: Query log retention (default: 604800)
    /// - `HOTQUERY_RESULT_TTL_SECS`: TTL for cached results (default: 86400)
    /// - `HOTQUERY_EMPTY_RESULT_TTL_SECS`: TTL for empty results (default: 3600)
    /// - `HOTQUERY_MAX_RESULT_BYTES`: Largest result the worker caches (default: 5 MiB)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let redis_url = std::env::var("HOTQUERY_REDIS_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());

        let stats_history_days = std::env::var("HOTQUERY_STATS_HISTORY_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_STATS_HISTORY_DAYS);

        let query_log_retention = Duration::from_secs(
            std::env::var("HOTQUERY_QUERY_LOG_RETENTION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(QUERY_LOG_RETENTION_SECS),
        );

        let default_result_ttl = Duration::from_secs(
            std::env::var("HOTQUERY_RESULT_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RESULT_TTL_SECS),
        );

        let empty_result_ttl = Duration::from_secs(
            std::env::var("HOTQUERY_EMPTY_RESULT_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(EMPTY_RESULT_TTL_SECS),
        );

        let max_result_bytes = std::env::var("HOTQUERY_MAX_RESULT_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_RESULT_BYTES);

        Self {
            redis_url,
            stats_history_days,
            query_log_retention,
            default_result_ttl,
            empty_result_ttl,
            max_result_bytes,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> HotqueryResult<()> {
        if self.redis_url.trim().is_empty() {
            return Err(HotqueryError::Config(ConfigError::InvalidValue {
                field: "redis_url".to_string(),
                value: self.redis_url.clone(),
                reason: "redis_url must not be empty".to_string(),
            }));
        }

        if self.stats_history_days <= 0 {
            return Err(HotqueryError::Config(ConfigError::InvalidValue {
                field: "stats_history_days".to_string(),
                value: self.stats_history_days.to_string(),
                reason: "stats_history_days must be greater than 0".to_string(),
            }));
        }

        for (field, value) in [
            ("query_log_retention", self.query_log_retention),
            ("default_result_ttl", self.default_result_ttl),
            ("empty_result_ttl", self.empty_result_ttl),
        ] {
            if value.is_zero() {
                return Err(HotqueryError::Config(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: format!("{:?}", value),
                    reason: format!("{} must be positive", field),
                }));
            }
        }

        if self.max_result_bytes == 0 {
            return Err(HotqueryError::Config(ConfigError::InvalidValue {
                field: "max_result_bytes".to_string(),
                value: self.max_result_bytes.to_string(),
                reason: "max_result_bytes must be greater than 0".to_string(),
            }));
        }

        Ok(())
    }
}

/// Thresholds a candidate must meet to be pre-warmed automatically.
///
/// The defaults reject one-off spikes: a query needs a meaningful score, a
/// hit within the last two days, and hits spread over at least two days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PrewarmCriteria {
    /// Score must be strictly above this.
    pub min_score: f64,
    /// Idle days must be strictly below this.
    pub max_consecutive_days_no_hits: u32,
    pub min_recent_hits: u64,
    pub min_active_days: u32,
    pub min_avg_hits_per_active_day: f64,
    /// Number of top-ranked candidates examined per run.
    pub scan_window: usize,
    /// Eligible candidates selected per run.
    pub max_per_run: usize,
}

impl Default for PrewarmCriteria {
    fn default() -> Self {
        Self {
            min_score: 15.0,
            max_consecutive_days_no_hits: 3,
            min_recent_hits: 3,
            min_active_days: 2,
            min_avg_hits_per_active_day: 1.5,
            scan_window: 50,
            max_per_run: 20,
        }
    }
}

impl PrewarmCriteria {
    /// Validate the thresholds.
    pub fn validate(&self) -> HotqueryResult<()> {
        if self.scan_window == 0 {
            return Err(HotqueryError::Config(ConfigError::InvalidValue {
                field: "scan_window".to_string(),
                value: self.scan_window.to_string(),
                reason: "scan_window must be greater than 0".to_string(),
            }));
        }
        if self.max_per_run == 0 {
            return Err(HotqueryError::Config(ConfigError::InvalidValue {
                field: "max_per_run".to_string(),
                value: self.max_per_run.to_string(),
                reason: "max_per_run must be greater than 0".to_string(),
            }));
        }
        if self.min_score < 0.0 || self.min_avg_hits_per_active_day < 0.0 {
            return Err(HotqueryError::Config(ConfigError::InvalidValue {
                field: "min_score".to_string(),
                value: self.min_score.to_string(),
                reason: "thresholds must be non-negative".to_string(),
            }));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
