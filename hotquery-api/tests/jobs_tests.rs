//! Pre-warm worker and planner against an in-memory store

use std::sync::Arc;
use std::time::Duration;

use hotquery_api::jobs::{
    drain_queue_once, plan_and_enqueue_once, prewarm_planner_task, prewarm_worker_task,
    PrewarmItemStatus, PrewarmPlannerConfig, PrewarmWorkerConfig, PrewarmWorkerDeps,
    PrewarmWorkerMetrics,
};
use hotquery_core::HotqueryResult;
use hotquery_test_utils::fixtures::*;
use hotquery_test_utils::*;
use tokio::sync::watch;

fn worker_config() -> PrewarmWorkerConfig {
    PrewarmWorkerConfig {
        poll_interval: Duration::from_millis(10),
        batch_size: 10,
        pause_between_queries: Duration::ZERO,
        max_result_bytes: 4 * 1024,
    }
}

fn deps(stack: &TestStack, executor: MockQueryExecutor) -> (PrewarmWorkerDeps, Arc<MockQueryExecutor>) {
    let executor = Arc::new(executor);
    let deps = PrewarmWorkerDeps {
        scheduler: stack.scheduler.clone(),
        cache: stack.cache.clone(),
        executor: executor.clone(),
    };
    (deps, executor)
}

#[tokio::test]
async fn drain_caches_results_and_skips_empty_and_oversized() -> HotqueryResult<()> {
    let stack = memory_stack();
    let today = fixed_day();
    let small = seed_candidate(&stack, stats_with_history("select small", today, &[(0, 3)]), 40.0).await?;
    let empty = seed_candidate(&stack, stats_with_history("select empty", today, &[(0, 3)]), 30.0).await?;
    let huge = seed_candidate(&stack, stats_with_history("select huge", today, &[(0, 3)]), 20.0).await?;
    stack
        .scheduler
        .request_prewarm(&[small.clone(), empty.clone(), huge.clone()])
        .await?;

    let executor = MockQueryExecutor::new()
        .with_rows("select small", sample_rows(2))
        .with_rows("select empty", Vec::new())
        .with_rows("select huge", sample_rows(500));
    let (deps, executor) = deps(&stack, executor);
    let metrics = PrewarmWorkerMetrics::new();

    let outcomes = drain_queue_once(&deps, &worker_config(), &metrics).await;

    let statuses: Vec<PrewarmItemStatus> = outcomes.iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![
            PrewarmItemStatus::Success,
            PrewarmItemStatus::Skipped,
            PrewarmItemStatus::Skipped
        ]
    );
    assert_eq!(outcomes[1].reason.as_deref(), Some("No data returned"));
    let too_large = outcomes[2].reason.clone().unwrap_or_default();
    assert!(too_large.starts_with("Dataset too large ("), "{}", too_large);
    assert!(too_large.ends_with("MB)"), "{}", too_large);

    assert_eq!(stack.cache.get_result(&small).await?, Some(sample_rows(2)));
    assert_eq!(stack.cache.get_result(&empty).await?, None);
    assert_eq!(stack.cache.get_result(&huge).await?, None);
    assert_eq!(executor.call_count(), 3);
    assert_eq!(stack.scheduler.queue_len().await?, 0);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.items_warmed, 1);
    assert_eq!(snapshot.items_skipped, 2);
    assert_eq!(snapshot.drain_cycles, 1);
    Ok(())
}

#[tokio::test]
async fn drain_counts_failures_without_requeue() -> HotqueryResult<()> {
    let stack = memory_stack();
    let key = seed_candidate(
        &stack,
        stats_with_history("select broken", fixed_day(), &[(0, 3)]),
        40.0,
    )
    .await?;
    stack.scheduler.request_prewarm(&[key.clone()]).await?;

    let executor = MockQueryExecutor::new().with_failure(
        "select broken",
        ExecutionError::QueryFailed {
            reason: "syntax error".to_string(),
        },
    );
    let (deps, _) = deps(&stack, executor);
    let metrics = PrewarmWorkerMetrics::new();

    let outcomes = drain_queue_once(&deps, &worker_config(), &metrics).await;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, PrewarmItemStatus::Failed);
    assert!(outcomes[0]
        .reason
        .as_deref()
        .unwrap_or_default()
        .contains("syntax error"));
    assert_eq!(metrics.snapshot().items_failed, 1);
    assert_eq!(stack.scheduler.queue_len().await?, 0);
    assert_eq!(stack.cache.get_result(&key).await?, None);
    Ok(())
}

#[tokio::test]
async fn persistent_queries_are_cached_without_expiry() -> HotqueryResult<()> {
    let stack = memory_stack();
    let mut record = stats_with_history("select persistent", fixed_day(), &[(0, 5), (1, 4), (2, 3)]);
    record.is_persistent = true;
    let key = seed_candidate(&stack, record, 70.0).await?;
    stack.scheduler.request_prewarm(&[key.clone()]).await?;

    let (deps, _) = deps(&stack, MockQueryExecutor::new().with_default_rows(sample_rows(1)));
    let outcomes = drain_queue_once(&deps, &worker_config(), &PrewarmWorkerMetrics::new()).await;

    assert_eq!(outcomes[0].status, PrewarmItemStatus::Success);
    assert!(outcomes[0].persistent);
    assert_eq!(stack.cache.get_result(&key).await?, Some(sample_rows(1)));
    Ok(())
}

#[tokio::test]
async fn drain_respects_batch_size() -> HotqueryResult<()> {
    let stack = memory_stack();
    let key = seed_candidate(&stack, stats_with_history("select 1", fixed_day(), &[(0, 3)]), 40.0).await?;
    stack
        .scheduler
        .request_prewarm(&[key.clone(), key.clone(), key.clone()])
        .await?;

    let (deps, executor) = deps(&stack, MockQueryExecutor::new().with_default_rows(sample_rows(1)));
    let config = PrewarmWorkerConfig {
        batch_size: 2,
        ..worker_config()
    };
    let outcomes = drain_queue_once(&deps, &config, &PrewarmWorkerMetrics::new()).await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(executor.call_count(), 2);
    assert_eq!(stack.scheduler.queue_len().await?, 1);
    Ok(())
}

#[tokio::test]
async fn worker_task_stops_on_shutdown() -> HotqueryResult<()> {
    let stack = memory_stack();
    let key = seed_candidate(&stack, stats_with_history("select 1", fixed_day(), &[(0, 3)]), 40.0).await?;
    stack.scheduler.request_prewarm(&[key.clone()]).await?;

    let (deps, _) = deps(&stack, MockQueryExecutor::new().with_default_rows(sample_rows(1)));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(prewarm_worker_task(deps, worker_config(), shutdown_rx));

    for _ in 0..100 {
        if stack.cache.get_result(&key).await?.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let _ = shutdown_tx.send(true);
    let metrics = handle.await.expect("worker task should not panic");

    assert_eq!(metrics.snapshot().items_warmed, 1);
    assert!(metrics.snapshot().drain_cycles >= 1);
    Ok(())
}

#[tokio::test]
async fn planner_enqueues_only_eligible_candidates() -> HotqueryResult<()> {
    let stack = memory_stack();
    let today = fixed_day();
    let eligible = seed_candidate(
        &stack,
        stats_with_history("select eligible", today, &[(0, 4), (1, 3)]),
        50.0,
    )
    .await?;
    seed_candidate(&stack, stats_with_history("select spike", today, &[(0, 9)]), 45.0).await?;
    seed_candidate(&stack, stats_with_history("select cold", today, &[(0, 1)]), 2.0).await?;

    let queued = plan_and_enqueue_once(&stack.scheduler, &PrewarmCriteria::default(), today).await?;

    assert_eq!(queued, 1);
    let item = stack.scheduler.dequeue().await?.expect("one item should be queued");
    assert_eq!(item.query_hash, eligible);
    assert_eq!(item.sql, "select eligible");
    Ok(())
}

#[tokio::test]
async fn zero_interval_jobs_run_and_stop_cleanly() -> HotqueryResult<()> {
    let stack = memory_stack();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let planner_config = PrewarmPlannerConfig {
        interval: Duration::ZERO,
        ..PrewarmPlannerConfig::default()
    };
    assert!(planner_config.validate().is_err());
    let planner = tokio::spawn(prewarm_planner_task(
        stack.scheduler.clone(),
        planner_config,
        shutdown_rx.clone(),
    ));

    let worker_config = PrewarmWorkerConfig {
        poll_interval: Duration::ZERO,
        ..worker_config()
    };
    assert!(worker_config.validate().is_err());
    let (deps, _) = deps(&stack, MockQueryExecutor::new());
    let worker = tokio::spawn(prewarm_worker_task(deps, worker_config, shutdown_rx));

    tokio::time::sleep(Duration::from_millis(20)).await;
    let _ = shutdown_tx.send(true);

    let planner = planner.await;
    assert!(planner.is_ok(), "planner should not panic");
    let worker = worker.await;
    assert!(worker.is_ok(), "worker should not panic");
    Ok(())
}
