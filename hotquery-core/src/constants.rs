//! Store key namespaces and tuning constants.
//!
//! The result cache and the pre-warm scheduler share one key-value store but
//! never write to each other's namespaces.

// ============================================================================
// KEY NAMESPACES
// ============================================================================

/// Prefix of per-query statistics records (`query:stats:{hash}`).
pub const STATS_KEY_PREFIX: &str = "query:stats:";

/// Prefix of per-execution log entries (`query:log:{short}:{millis}`).
pub const QUERY_LOG_KEY_PREFIX: &str = "query:log:";

/// Sorted set of cache keys ranked by pre-warm score.
pub const PREWARM_CANDIDATES_KEY: &str = "query:prewarm:candidates";

/// List of JSON-encoded pre-warm work items.
pub const PREWARM_QUEUE_KEY: &str = "prewarm:queue";

// ============================================================================
// DISPLAY
// ============================================================================

/// Length of the shortened display hash.
pub const SHORT_HASH_LEN: usize = 8;

/// Number of SQL characters kept in previews.
pub const SQL_PREVIEW_CHARS: usize = 100;

// ============================================================================
// SCORING
// ============================================================================

/// Days of hit history kept on a stats record.
pub const DEFAULT_STATS_HISTORY_DAYS: i64 = 14;

/// Window used for "recent" activity metrics.
pub const RECENT_WINDOW_DAYS: i64 = 7;

/// Per-day decay applied to the score while a query sees no hits.
pub const SCORE_DECAY_PER_IDLE_DAY: f64 = 0.75;

/// Candidates scoring at or below this are not explained in dry-run reports.
pub const EXPLAIN_EXCLUSION_MIN_SCORE: f64 = 10.0;

/// Maximum number of excluded candidates listed in a dry-run report.
pub const MAX_EXCLUDED_REPORTED: usize = 10;

// ============================================================================
// CACHE LIFETIMES
// ============================================================================

/// TTL for non-persistent results (24 hours).
pub const DEFAULT_RESULT_TTL_SECS: u64 = 86_400;

/// TTL for queries using time-of-day functions (1 hour).
pub const HOURLY_RESULT_TTL_SECS: u64 = 3_600;

/// TTL for empty result sets (1 hour).
pub const EMPTY_RESULT_TTL_SECS: u64 = 3_600;

/// Retention of query log entries (7 days).
pub const QUERY_LOG_RETENTION_SECS: u64 = 604_800;

/// Result payloads above this size are never written by the pre-warm worker.
pub const DEFAULT_MAX_RESULT_BYTES: usize = 5 * 1024 * 1024;
