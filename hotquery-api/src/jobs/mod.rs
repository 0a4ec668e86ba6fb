//! Background Jobs
//!
//! - `prewarm_worker`: drains the pre-warm queue and caches results
//! - `prewarm_planner`: periodically queues the eligible top candidates
//!
//! # Usage
//!
//! ```ignore
//! use hotquery_api::jobs::{prewarm_planner_task, prewarm_worker_task};
//! use tokio::sync::watch;
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! tokio::spawn(prewarm_worker_task(deps, PrewarmWorkerConfig::from_env(), shutdown_rx.clone()));
//! tokio::spawn(prewarm_planner_task(scheduler, PrewarmPlannerConfig::from_env(), shutdown_rx));
//!
//! // On shutdown
//! let _ = shutdown_tx.send(true);
//! ```

pub mod prewarm_planner;
pub mod prewarm_worker;

pub use prewarm_planner::{
    plan_and_enqueue_once, prewarm_planner_task, PrewarmPlannerConfig, PrewarmPlannerMetrics,
    PrewarmPlannerSnapshot,
};
pub use prewarm_worker::{
    drain_queue_once, prewarm_worker_task, PrewarmItemStatus, PrewarmOutcome,
    PrewarmWorkerConfig, PrewarmWorkerDeps, PrewarmWorkerMetrics, PrewarmWorkerSnapshot,
};
