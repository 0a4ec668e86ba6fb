//! Per-query usage statistics and execution log entries.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::hasher::CacheKey;
use crate::scoring;

/// How a query execution was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum CacheStatus {
    /// Served from the result cache.
    Hit,
    /// Executed against the warehouse.
    Miss,
    /// Served from cache while a refresh ran.
    Revalidated,
}

impl CacheStatus {
    /// Whether this execution counts as a cache hit.
    pub fn is_hit(self) -> bool {
        matches!(self, CacheStatus::Hit | CacheStatus::Revalidated)
    }
}

/// One recorded query execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct QueryExecution {
    pub query_hash: CacheKey,
    pub short_hash: String,
    pub sql: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub cache_status: CacheStatus,
    pub row_count: u64,
    /// Wall-clock duration in milliseconds.
    pub duration: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_size: Option<u64>,
}

impl QueryExecution {
    pub fn new(
        query_hash: CacheKey,
        sql: impl Into<String>,
        cache_status: CacheStatus,
        row_count: u64,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            short_hash: query_hash.short().to_string(),
            query_hash,
            sql: sql.into(),
            user_id: None,
            cache_status,
            row_count,
            duration: duration_ms,
            timestamp,
            data_size: None,
        }
    }

    pub fn with_user(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_data_size(mut self, bytes: u64) -> Self {
        self.data_size = Some(bytes);
        self
    }

    /// UTC calendar day of the execution.
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Usage statistics of one cached query, stored at `query:stats:{hash}`.
///
/// Field names match the JSON records already present in deployed stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct QueryStatsRecord {
    pub query_hash: CacheKey,
    pub short_hash: String,
    pub sql: String,
    pub total_hits: u64,
    pub total_misses: u64,
    pub total_executions: u64,
    /// Average duration in milliseconds.
    pub avg_duration: f64,
    pub avg_row_count: f64,
    pub last_executed: Option<DateTime<Utc>>,
    pub last_cache_hit: Option<DateTime<Utc>>,
    pub first_seen: DateTime<Utc>,
    /// Hit rate as a percentage.
    pub cache_hit_rate: f64,
    #[serde(rename = "preWarmScore")]
    pub prewarm_score: f64,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub daily_hit_history: BTreeMap<NaiveDate, u64>,
    #[serde(default)]
    pub consecutive_days_no_hits: u32,
    #[serde(default)]
    pub is_persistent: bool,
}

impl QueryStatsRecord {
    /// Fresh record for a query seen for the first time.
    pub fn new(query_hash: CacheKey, sql: impl Into<String>, first_seen: DateTime<Utc>) -> Self {
        Self {
            short_hash: query_hash.short().to_string(),
            query_hash,
            sql: sql.into(),
            total_hits: 0,
            total_misses: 0,
            total_executions: 0,
            avg_duration: 0.0,
            avg_row_count: 0.0,
            last_executed: None,
            last_cache_hit: None,
            first_seen,
            cache_hit_rate: 0.0,
            prewarm_score: 0.0,
            daily_hit_history: BTreeMap::new(),
            consecutive_days_no_hits: 0,
            is_persistent: false,
        }
    }

    /// Fold one execution into the record and recompute score and persistence.
    pub fn apply_execution(&mut self, execution: &QueryExecution, history_days: i64) {
        let today = execution.day();

        self.total_executions += 1;
        if execution.cache_status.is_hit() {
            self.total_hits += 1;
            self.last_cache_hit = Some(execution.timestamp);
            *self.daily_hit_history.entry(today).or_insert(0) += 1;
        } else {
            self.total_misses += 1;
        }

        let n = self.total_executions as f64;
        self.avg_duration = (self.avg_duration * (n - 1.0) + execution.duration as f64) / n;
        self.avg_row_count = (self.avg_row_count * (n - 1.0) + execution.row_count as f64) / n;
        self.last_executed = Some(execution.timestamp);
        self.cache_hit_rate = self.total_hits as f64 / n * 100.0;

        scoring::prune_history(self, today, history_days);
        self.consecutive_days_no_hits = scoring::consecutive_days_without_hits(self, today);
        self.prewarm_score = scoring::prewarm_score(self, today);
        self.is_persistent = scoring::should_persist(self, today);
    }

    /// Hits recorded on `day`.
    pub fn hits_on(&self, day: NaiveDate) -> u64 {
        self.daily_hit_history.get(&day).copied().unwrap_or(0)
    }
}

// =============================================================================
// TESTS
// =============================================================================
