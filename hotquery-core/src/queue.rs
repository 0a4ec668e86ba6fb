//! Pre-warm work items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hasher::CacheKey;
use crate::stats::QueryStatsRecord;

/// One entry of the `prewarm:queue` list, consumed by the pre-warm worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PrewarmQueueItem {
    pub query_hash: CacheKey,
    /// Full SQL text to execute.
    pub sql: String,
    /// Pre-warm score at the time the item was queued.
    pub priority: f64,
    pub queued_at: DateTime<Utc>,
}

impl PrewarmQueueItem {
    /// Build a queue item from the query's current statistics.
    pub fn from_stats(stats: &QueryStatsRecord, queued_at: DateTime<Utc>) -> Self {
        Self {
            query_hash: stats.query_hash.clone(),
            sql: stats.sql.clone(),
            priority: stats.prewarm_score,
            queued_at,
        }
    }

    pub fn short_hash(&self) -> &str {
        self.query_hash.short()
    }
}

// =============================================================================
// TESTS
// =============================================================================
