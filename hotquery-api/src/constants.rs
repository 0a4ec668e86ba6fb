//! Constants for the hotquery admin interface and background jobs

use std::time::Duration;

// ============================================================================
// ADMIN MESSAGES
// ============================================================================

pub const MSG_ALL_CLEARED: &str = "All cache cleared successfully";

pub const MSG_CACHE_DELETED: &str = "Cache deleted successfully";

pub const MSG_CACHE_NOT_FOUND: &str = "Cache not found";

pub const MSG_DELETE_TARGET_REQUIRED: &str =
    "Must provide either 'hash', 'sql', or set 'all': true";

pub const MSG_PATTERN_REQUIRED: &str = "Pattern is required (or use clearAll: true)";

pub const MSG_PREWARM_TARGET_REQUIRED: &str =
    "Must provide either queryHashes array or topN number";

pub const MSG_PLAN_PREVIEW: &str = "These queries would be pre-warmed if job runs now";

// ============================================================================
// PRE-WARM WORKER
// ============================================================================

/// How often the worker drains the queue (seconds)
pub const DEFAULT_WORKER_POLL_INTERVAL_SECS: u64 = 30;

/// Maximum queue items executed per drain
pub const DEFAULT_WORKER_BATCH_SIZE: usize = 20;

/// Pause between consecutive warehouse queries (milliseconds)
pub const DEFAULT_WORKER_PAUSE_MS: u64 = 1000;

// ============================================================================
// PRE-WARM PLANNER
// ============================================================================

/// How often the planner enqueues eligible candidates (24 hours)
pub const DEFAULT_PLANNER_INTERVAL_SECS: u64 = 86400;

/// Shortest period a job timer will tick at
pub const MIN_TICK: Duration = Duration::from_millis(1);

// ============================================================================
// WAREHOUSE EXECUTOR
// ============================================================================

/// Request timeout for warehouse proxy calls (seconds)
pub const DEFAULT_EXECUTOR_TIMEOUT_SECS: u64 = 120;

// ============================================================================
// TELEMETRY
// ============================================================================

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "hotquery=info,info";
