//! hotquery worker entry point
//!
//! Connects to Redis, then runs the pre-warm worker and planner until
//! ctrl-c.

use std::sync::Arc;

use hotquery_api::jobs::{
    prewarm_planner_task, prewarm_worker_task, PrewarmPlannerConfig, PrewarmWorkerConfig,
    PrewarmWorkerDeps,
};
use hotquery_api::telemetry::{init_tracing, TelemetryConfig};
use hotquery_api::{ApiError, ApiResult, HttpQueryExecutor};
use hotquery_core::HotqueryConfig;
use hotquery_storage::{PrewarmScheduler, RedisConnector, ResultCache, StoreHandle};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(&TelemetryConfig::from_env())?;

    let config = HotqueryConfig::from_env();
    config.validate()?;

    let planner_config = PrewarmPlannerConfig::from_env();
    planner_config.validate()?;
    let worker_config = PrewarmWorkerConfig {
        max_result_bytes: config.max_result_bytes,
        ..PrewarmWorkerConfig::from_env()
    };
    worker_config.validate()?;

    let executor = HttpQueryExecutor::from_env()?;
    tracing::info!(endpoint = %executor.endpoint(), "Warehouse executor configured");

    let handle = StoreHandle::new(RedisConnector::new(config.redis_url.clone()));
    let store = handle.store().await?;

    let cache = ResultCache::new(store, &config);
    let scheduler = PrewarmScheduler::new(cache.clone());
    let deps = PrewarmWorkerDeps {
        scheduler: scheduler.clone(),
        cache,
        executor: Arc::new(executor),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = tokio::spawn(prewarm_worker_task(deps, worker_config, shutdown_rx.clone()));
    let planner = tokio::spawn(prewarm_planner_task(scheduler, planner_config, shutdown_rx));

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to listen for ctrl-c: {}", e)))?;
    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(true);

    for (name, joined) in [
        ("worker", worker.await.map(|m| format!("{:?}", m.snapshot()))),
        ("planner", planner.await.map(|m| format!("{:?}", m.snapshot()))),
    ] {
        match joined {
            Ok(summary) => tracing::info!(job = name, summary = %summary, "Job stopped"),
            Err(e) => tracing::error!(job = name, error = %e, "Job panicked"),
        }
    }

    handle.close().await;
    Ok(())
}
