//! hotquery Test Utilities
//!
//! Shared test infrastructure for the hotquery workspace:
//! - A scriptable mock query executor
//! - Fixtures that assemble an in-memory cache stack and seed statistics
//! - Proptest generators for SQL text, users and hashes
//! - Assertions for hotquery error variants

// Re-export the in-memory store from its source crate
pub use hotquery_storage::{KvStore, MemoryStore};

// Re-export core types for convenience
pub use hotquery_core::{
    compute_cache_key, compute_cache_key_on, CacheKey, CacheStatus, ExecutionError,
    HotqueryConfig, HotqueryError, HotqueryResult, PrewarmCriteria, QueryExecution,
    QueryStatsRecord, StorageError, ValidationError,
};
pub use hotquery_storage::{PrewarmScheduler, QueryExecutor, QueryTracker, ResultCache, Rows};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

// ============================================================================
// MOCK EXECUTOR
// ============================================================================

/// A scripted executor response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Rows(Rows),
    Fail(ExecutionError),
}

/// Query executor that answers from a script and records every call.
///
/// SQL without a scripted response returns the default rows.
#[derive(Debug, Default)]
pub struct MockQueryExecutor {
    responses: HashMap<String, MockResponse>,
    default_rows: Rows,
    calls: Mutex<Vec<String>>,
}

impl MockQueryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `rows` for any unscripted SQL.
    pub fn with_default_rows(mut self, rows: Rows) -> Self {
        self.default_rows = rows;
        self
    }

    /// Return `rows` for exactly `sql`.
    pub fn with_rows(mut self, sql: impl Into<String>, rows: Rows) -> Self {
        self.responses.insert(sql.into(), MockResponse::Rows(rows));
        self
    }

    /// Fail `sql` with `error`.
    pub fn with_failure(mut self, sql: impl Into<String>, error: ExecutionError) -> Self {
        self.responses.insert(sql.into(), MockResponse::Fail(error));
        self
    }

    /// SQL text of every call, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

#[async_trait]
impl QueryExecutor for MockQueryExecutor {
    async fn execute(&self, sql: &str) -> HotqueryResult<Rows> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(sql.to_string());
        }
        match self.responses.get(sql) {
            Some(MockResponse::Rows(rows)) => Ok(rows.clone()),
            Some(MockResponse::Fail(error)) => Err(error.clone().into()),
            None => Ok(self.default_rows.clone()),
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for hotquery inputs.

    use proptest::prelude::*;

    /// SQL-ish text with irregular whitespace and casing.
    pub fn arb_sql() -> impl Strategy<Value = String> {
        (
            prop::sample::select(vec!["select", "SELECT", "Select"]),
            prop::sample::select(vec!["*", "id, name", "count(*)", "vin"]),
            prop::sample::select(vec!["fleet", "battery", "gps_points", "sales"]),
            prop::sample::select(vec![" ", "  ", "\n", "\t "]),
        )
            .prop_map(|(kw, cols, table, ws)| format!("{kw}{ws}{cols}{ws}from{ws}{table}"))
    }

    /// A user id, or none.
    pub fn arb_user_id() -> impl Strategy<Value = Option<String>> {
        prop::option::of("[a-z][a-z0-9_]{0,11}")
    }

    /// A well-formed cache key in mixed case.
    pub fn arb_hash_text() -> impl Strategy<Value = String> {
        "[0-9a-fA-F]{64}"
    }

    /// Text that is not a valid cache key.
    pub fn arb_invalid_hash() -> impl Strategy<Value = String> {
        prop_oneof![
            "[0-9a-f]{1,63}",
            "[0-9a-f]{65,80}",
            "[g-z]{64}",
            "[0-9a-f]{30}[ _-][0-9a-f]{33}",
        ]
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! In-memory cache stacks and seeded statistics.

    use super::*;
    use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
    use std::sync::Arc;

    /// Result cache, scheduler and tracker over one in-memory store.
    #[derive(Debug, Clone)]
    pub struct TestStack {
        pub store: Arc<dyn KvStore>,
        pub config: HotqueryConfig,
        pub cache: ResultCache,
        pub scheduler: PrewarmScheduler,
        pub tracker: QueryTracker,
    }

    pub fn memory_stack() -> TestStack {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let config = HotqueryConfig::default();
        let cache = ResultCache::new(Arc::clone(&store), &config);
        let scheduler = PrewarmScheduler::new(cache.clone());
        let tracker = QueryTracker::new(cache.clone(), scheduler.clone(), &config);
        TestStack {
            store,
            config,
            cache,
            scheduler,
            tracker,
        }
    }

    /// A fixed day for deterministic hashing.
    pub fn fixed_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 14).unwrap_or_default()
    }

    pub fn at_noon(day: NaiveDate) -> DateTime<Utc> {
        Utc.from_utc_datetime(&day.and_hms_opt(12, 0, 0).unwrap_or_default())
    }

    /// Sample warehouse rows.
    pub fn sample_rows(n: usize) -> Rows {
        (0..n)
            .map(|i| serde_json::json!({ "id": i, "vin": format!("VIN{:05}", i) }))
            .collect()
    }

    /// Statistics for `sql` with the given `(days_ago, hits)` history
    /// relative to `today`.
    pub fn stats_with_history(
        sql: &str,
        today: NaiveDate,
        history: &[(i64, u64)],
    ) -> QueryStatsRecord {
        let key = compute_cache_key_on(sql, None, today);
        let first_seen = at_noon(today - ChronoDuration::days(30));
        let mut record = QueryStatsRecord::new(key, sql, first_seen);
        for (days_ago, hits) in history {
            record
                .daily_hit_history
                .insert(today - ChronoDuration::days(*days_ago), *hits);
            record.total_hits += hits;
        }
        record.total_executions = record.total_hits;
        record.last_executed = Some(at_noon(today));
        record.last_cache_hit = Some(at_noon(today));
        record
    }

    /// Store `record` and rank it with `score`.
    pub async fn seed_candidate(
        stack: &TestStack,
        mut record: QueryStatsRecord,
        score: f64,
    ) -> HotqueryResult<CacheKey> {
        record.prewarm_score = score;
        let key = record.query_hash.clone();
        stack.cache.put(&key, &record).await?;
        stack.scheduler.rank(&key, score).await?;
        Ok(key)
    }

    /// Rank `key` without storing statistics for it.
    pub async fn seed_rank_only(stack: &TestStack, key: &CacheKey, score: f64) -> HotqueryResult<()> {
        stack.scheduler.rank(key, score).await
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for hotquery error variants.

    use super::*;

    /// Assert that a HotqueryResult is an Execution error.
    #[track_caller]
    pub fn assert_execution_error<T: std::fmt::Debug>(result: &HotqueryResult<T>) {
        match result {
            Err(HotqueryError::Execution(_)) => {}
            other => panic!("Expected Execution error, got: {:?}", other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
