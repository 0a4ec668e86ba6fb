//! Read-through query path.
//!
//! Serves a query from the result cache when possible, otherwise executes
//! it through a [`QueryExecutor`], caches the rows with a lifetime chosen by
//! [`CacheStrategy`], and records the execution either way.

use std::time::Instant;

use chrono::{DateTime, Utc};
use hotquery_core::{
    compute_cache_key_on, CacheKey, CacheStatus, CacheStrategy, HotqueryError, HotqueryResult,
    QueryExecution,
};
use serde::{Deserialize, Serialize};

use crate::executor::QueryExecutor;
use crate::result_cache::{ResultCache, Rows};
use crate::tracker::QueryTracker;

/// A query as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub sql: String,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Treat the query as date-dependent regardless of its text.
    #[serde(default)]
    pub force_dynamic: bool,
}

impl QueryRequest {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            user_id: None,
            force_dynamic: false,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Result of a read-through query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub key: CacheKey,
    pub rows: Rows,
    pub status: CacheStatus,
    pub strategy: CacheStrategy,
    pub persistent: bool,
    pub duration_ms: u64,
}

/// Cache-first query execution.
#[derive(Debug, Clone)]
pub struct ReadThroughQuery {
    cache: ResultCache,
    tracker: QueryTracker,
}

impl ReadThroughQuery {
    pub fn new(cache: ResultCache, tracker: QueryTracker) -> Self {
        Self { cache, tracker }
    }

    pub async fn run(
        &self,
        request: &QueryRequest,
        executor: &dyn QueryExecutor,
    ) -> HotqueryResult<QueryOutcome> {
        self.run_at(request, executor, Utc::now()).await
    }

    /// Run as if the current time were `now`.
    pub async fn run_at(
        &self,
        request: &QueryRequest,
        executor: &dyn QueryExecutor,
        now: DateTime<Utc>,
    ) -> HotqueryResult<QueryOutcome> {
        if request.sql.trim().is_empty() {
            return Err(HotqueryError::missing_field("sql"));
        }

        let started = Instant::now();
        let key = compute_cache_key_on(&request.sql, request.user_id.as_deref(), now.date_naive());
        let strategy = CacheStrategy::classify(&request.sql, request.force_dynamic);
        let stats = self.cache.get(&key).await?;
        let persistent = stats.as_ref().map(|s| s.is_persistent).unwrap_or(false);

        if let Some(rows) = self.cache.get_result(&key).await? {
            let duration_ms = started.elapsed().as_millis() as u64;
            tracing::info!(hash = %key.short(), strategy = %strategy, rows = rows.len(), duration_ms, "Cache hit");
            self.track(&key, request, CacheStatus::Hit, rows.len(), duration_ms, now, None)
                .await;
            return Ok(QueryOutcome {
                key,
                rows,
                status: CacheStatus::Hit,
                strategy,
                persistent,
                duration_ms,
            });
        }

        tracing::info!(hash = %key.short(), strategy = %strategy, "Cache miss, executing query");
        let rows = executor.execute(&request.sql).await.map_err(|e| {
            tracing::error!(hash = %key.short(), error = %e, "Query execution failed");
            e
        })?;

        let ttl = self.cache.ttl_for(strategy, stats.as_ref(), rows.is_empty());
        let data_size = match self.cache.put_result(&key, &rows, ttl).await {
            Ok(bytes) => Some(bytes as u64),
            Err(e) => {
                tracing::warn!(hash = %key.short(), error = %e, "Cache write failed");
                None
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        self.track(&key, request, CacheStatus::Miss, rows.len(), duration_ms, now, data_size)
            .await;

        Ok(QueryOutcome {
            key,
            rows,
            status: CacheStatus::Miss,
            strategy,
            persistent,
            duration_ms,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn track(
        &self,
        key: &CacheKey,
        request: &QueryRequest,
        status: CacheStatus,
        row_count: usize,
        duration_ms: u64,
        now: DateTime<Utc>,
        data_size: Option<u64>,
    ) {
        let mut execution =
            QueryExecution::new(key.clone(), request.sql.clone(), status, row_count as u64, duration_ms, now)
                .with_user(request.user_id.clone());
        execution.data_size = data_size;

        if let Err(e) = self.tracker.record(&execution).await {
            tracing::warn!(hash = %key.short(), error = %e, "Failed to record query analytics");
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
