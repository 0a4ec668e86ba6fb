//! hotquery core data types
//!
//! Pure building blocks shared by the storage layer and the administration
//! surface: the query hasher, per-query statistics, pre-warm scoring, cache
//! lifetime classification, configuration and the error hierarchy. Nothing in
//! this crate performs I/O.

pub mod config;
pub mod constants;
pub mod error;
pub mod hasher;
pub mod queue;
pub mod scoring;
pub mod stats;
pub mod strategy;

pub use config::{HotqueryConfig, PrewarmCriteria, DEFAULT_REDIS_URL};
pub use error::{
    ConfigError, ExecutionError, HotqueryError, HotqueryResult, StorageError, ValidationError,
};
pub use hasher::{
    compute_cache_key, compute_cache_key_on, normalize_sql, sql_preview, CacheKey, CACHE_KEY_LEN,
};
pub use queue::PrewarmQueueItem;
pub use scoring::{Eligibility, ExclusionReason};
pub use stats::{CacheStatus, QueryExecution, QueryStatsRecord};
pub use strategy::CacheStrategy;
