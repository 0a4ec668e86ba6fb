//! hotquery API - Cache Administration and Background Jobs
//!
//! The boundary operations external route handlers call to invalidate the
//! result cache and queue pre-warms, the background jobs that drain the
//! queue, and the warehouse executor the jobs run queries through.

pub mod admin;
pub mod constants;
pub mod error;
pub mod executor;
pub mod jobs;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use admin::{validate_prewarm, AdminReply, CacheAdmin, PrewarmTarget};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use executor::HttpQueryExecutor;
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};
pub use types::*;
