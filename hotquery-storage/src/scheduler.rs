//! Pre-warm scheduler.
//!
//! Maintains the candidate ranking (`query:prewarm:candidates`, a sorted set
//! of cache keys by pre-warm score) and the work queue (`prewarm:queue`, a
//! list of JSON [`PrewarmQueueItem`]s). The scheduler only enqueues; an
//! external worker drains the queue and executes the queries.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use hotquery_core::constants::{
    EXPLAIN_EXCLUSION_MIN_SCORE, MAX_EXCLUDED_REPORTED, PREWARM_CANDIDATES_KEY, PREWARM_QUEUE_KEY,
};
use hotquery_core::{
    sql_preview, CacheKey, ExclusionReason, HotqueryError, HotqueryResult, PrewarmCriteria,
    PrewarmQueueItem, QueryStatsRecord, StorageError,
};
use serde::{Deserialize, Serialize};

use crate::result_cache::ResultCache;
use crate::store::KvStore;

/// Status reported for every successfully queued query.
pub const QUEUED_STATUS: &str = "queued";

/// Report entry for one queued query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedPrewarm {
    /// Short display hash.
    pub hash: String,
    /// SQL preview.
    pub sql: String,
    pub score: f64,
    pub status: String,
}

/// One examined candidate of a dry-run plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedCandidate {
    pub query_hash: CacheKey,
    /// Short display hash.
    pub hash: String,
    /// SQL preview.
    pub sql: String,
    pub score: f64,
    pub recent_hits: u64,
    pub active_days: u32,
    pub avg_hits_per_active_day: f64,
    pub is_persistent: bool,
    pub consecutive_days_no_hits: u32,
    pub is_cached: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_reasons: Vec<ExclusionReason>,
}

/// Dry-run report: what an automatic pre-warm run would pick right now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrewarmPlan {
    pub candidates: Vec<PlannedCandidate>,
    /// Notable exclusions, for diagnostics. Capped.
    pub excluded: Vec<PlannedCandidate>,
    pub criteria: PrewarmCriteria,
}

impl PrewarmPlan {
    pub fn candidate_keys(&self) -> Vec<CacheKey> {
        self.candidates
            .iter()
            .map(|c| c.query_hash.clone())
            .collect()
    }
}

/// Candidate ranking and pre-warm queue over a shared store.
#[derive(Debug, Clone)]
pub struct PrewarmScheduler {
    store: Arc<dyn KvStore>,
    cache: ResultCache,
}

impl PrewarmScheduler {
    pub fn new(cache: ResultCache) -> Self {
        Self {
            store: Arc::clone(cache.store()),
            cache,
        }
    }

    // ========================================================================
    // RANKING
    // ========================================================================

    /// Insert or update a candidate's score.
    pub async fn rank(&self, key: &CacheKey, score: f64) -> HotqueryResult<()> {
        self.store
            .sorted_set_add(PREWARM_CANDIDATES_KEY, key.as_str(), score)
            .await
    }

    /// Up to `n` highest-scoring candidates, highest first.
    ///
    /// Members that are not valid cache keys are skipped.
    pub async fn top_candidates(&self, n: usize) -> HotqueryResult<Vec<(CacheKey, f64)>> {
        let ranked = self.store.sorted_set_top(PREWARM_CANDIDATES_KEY, n).await?;
        Ok(ranked
            .into_iter()
            .filter_map(|(member, score)| match CacheKey::parse(&member) {
                Ok(key) => Some((key, score)),
                Err(_) => {
                    tracing::warn!(member = %member, "Skipping malformed candidate member");
                    None
                }
            })
            .collect())
    }

    // ========================================================================
    // QUEUE
    // ========================================================================

    /// Queue the given queries in order.
    ///
    /// Hashes without statistics are skipped silently. Each queued query
    /// appends one work item; queuing the same hash twice queues it twice.
    pub async fn request_prewarm(&self, keys: &[CacheKey]) -> HotqueryResult<Vec<QueuedPrewarm>> {
        let mut queued = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(stats) = self.cache.get(key).await? else {
                tracing::debug!(hash = %key.short(), "No stats for hash, not queued");
                continue;
            };
            self.enqueue(&stats).await?;
            queued.push(QueuedPrewarm {
                hash: stats.short_hash.clone(),
                sql: sql_preview(&stats.sql),
                score: stats.prewarm_score,
                status: QUEUED_STATUS.to_string(),
            });
        }
        tracing::info!(requested = keys.len(), queued = queued.len(), "Queued queries for pre-warming");
        Ok(queued)
    }

    /// Queue the `n` highest-ranked candidates.
    pub async fn request_prewarm_top_n(&self, n: usize) -> HotqueryResult<Vec<QueuedPrewarm>> {
        if n == 0 {
            return Err(HotqueryError::invalid_value("topN", "must be greater than 0"));
        }
        let keys: Vec<CacheKey> = self
            .top_candidates(n)
            .await?
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        self.request_prewarm(&keys).await
    }

    async fn enqueue(&self, stats: &QueryStatsRecord) -> HotqueryResult<()> {
        let item = PrewarmQueueItem::from_stats(stats, Utc::now());
        let raw = serde_json::to_string(&item).map_err(|e| StorageError::Serialization {
            key: PREWARM_QUEUE_KEY.to_string(),
            reason: e.to_string(),
        })?;
        self.store.list_push(PREWARM_QUEUE_KEY, &raw).await?;
        Ok(())
    }

    /// Take the oldest queued item.
    ///
    /// Items that fail to decode are logged and dropped.
    pub async fn dequeue(&self) -> HotqueryResult<Option<PrewarmQueueItem>> {
        while let Some(raw) = self.store.list_pop(PREWARM_QUEUE_KEY).await? {
            match serde_json::from_str::<PrewarmQueueItem>(&raw) {
                Ok(item) => return Ok(Some(item)),
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping undecodable pre-warm queue item");
                }
            }
        }
        Ok(None)
    }

    pub async fn queue_len(&self) -> HotqueryResult<u64> {
        self.store.list_len(PREWARM_QUEUE_KEY).await
    }

    // ========================================================================
    // PLANNING
    // ========================================================================

    /// Dry run of an automatic pre-warm selection as of `today`.
    ///
    /// Walks the top `scan_window` candidates, skipping already-cached
    /// queries and those failing `criteria`, and stops after `max_per_run`
    /// selections.
    pub async fn plan(
        &self,
        criteria: &PrewarmCriteria,
        today: NaiveDate,
    ) -> HotqueryResult<PrewarmPlan> {
        let mut candidates = Vec::new();
        let mut excluded = Vec::new();

        for (key, _) in self.top_candidates(criteria.scan_window).await? {
            let is_cached = self.store.exists(key.as_str()).await?;
            let Some(stats) = self.cache.get(&key).await? else {
                continue;
            };

            let eligibility = criteria.evaluate(&stats, today);
            let mut entry = PlannedCandidate {
                query_hash: key.clone(),
                hash: stats.short_hash.clone(),
                sql: sql_preview(&stats.sql),
                score: stats.prewarm_score,
                recent_hits: eligibility.recent_hits,
                active_days: eligibility.active_days,
                avg_hits_per_active_day: eligibility.avg_hits_per_active_day,
                is_persistent: stats.is_persistent,
                consecutive_days_no_hits: stats.consecutive_days_no_hits,
                is_cached,
                excluded_reasons: Vec::new(),
            };

            if eligibility.is_eligible() && !is_cached {
                tracing::debug!(hash = %entry.hash, score = entry.score, "Pre-warm candidate selected");
                candidates.push(entry);
            } else if stats.prewarm_score > EXPLAIN_EXCLUSION_MIN_SCORE {
                if is_cached {
                    entry.excluded_reasons.push(ExclusionReason::AlreadyCached);
                }
                entry.excluded_reasons.extend(eligibility.reasons);
                tracing::debug!(
                    hash = %entry.hash,
                    reasons = ?entry.excluded_reasons,
                    "Pre-warm candidate excluded"
                );
                excluded.push(entry);
            }

            if candidates.len() >= criteria.max_per_run {
                break;
            }
        }

        excluded.truncate(MAX_EXCLUDED_REPORTED);
        Ok(PrewarmPlan {
            candidates,
            excluded,
            criteria: criteria.clone(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
