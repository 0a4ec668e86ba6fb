//! Cache administration interface against an in-memory store

use axum::http::StatusCode;
use hotquery_api::{
    ApiResult, CacheAdmin, ClearPatternRequest, DeleteCacheRequest, ErrorCode, FlexibleBool,
    PrewarmRequest,
};
use hotquery_core::constants::PREWARM_QUEUE_KEY;
use hotquery_test_utils::fixtures::*;
use hotquery_test_utils::*;

fn admin(stack: &TestStack) -> CacheAdmin {
    CacheAdmin::new(stack.cache.clone(), stack.scheduler.clone())
}

#[tokio::test]
async fn delete_by_sql_reports_not_found_with_computed_key() -> ApiResult<()> {
    let stack = memory_stack();
    let today = fixed_day();

    let reply = admin(&stack)
        .delete_cache_on(DeleteCacheRequest::by_sql("select 1", Some("bob".to_string())), today)
        .await?;

    let expected = compute_cache_key_on("select 1", Some("bob"), today);
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body.message, "Cache not found");
    assert_eq!(reply.body.key.as_deref(), Some(expected.as_str()));
    Ok(())
}

#[tokio::test]
async fn delete_by_sql_removes_cached_rows() -> ApiResult<()> {
    let stack = memory_stack();
    let today = fixed_day();
    let key = compute_cache_key_on("SELECT  *  FROM fleet", Some("alice"), today);
    stack.cache.put_result(&key, &sample_rows(3), None).await?;

    let reply = admin(&stack)
        .delete_cache_on(
            DeleteCacheRequest::by_sql("select * from fleet", Some("alice".to_string())),
            today,
        )
        .await?;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body.message, "Cache deleted successfully");
    assert_eq!(reply.body.key.as_deref(), Some(key.as_str()));
    assert_eq!(stack.cache.get_result(&key).await?, None);
    Ok(())
}

#[tokio::test]
async fn delete_by_hash_is_case_insensitive() -> ApiResult<()> {
    let stack = memory_stack();
    let key = compute_cache_key_on("select vin from battery", None, fixed_day());
    stack.cache.put_result(&key, &sample_rows(1), None).await?;

    let reply = admin(&stack)
        .delete_cache(DeleteCacheRequest::by_hash(key.as_str().to_ascii_uppercase()))
        .await?;
    assert_eq!(reply.status, StatusCode::OK);

    let again = admin(&stack)
        .delete_cache(DeleteCacheRequest::by_hash(key.as_str()))
        .await?;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn delete_without_target_fails_before_touching_store() -> ApiResult<()> {
    let stack = memory_stack();
    stack.store.set("unrelated", "kept", None).await?;

    let err = admin(&stack)
        .delete_cache(DeleteCacheRequest {
            sql: Some("   ".to_string()),
            all: Some(FlexibleBool::Text("no".to_string())),
            ..DeleteCacheRequest::default()
        })
        .await
        .expect_err("blank request should fail");

    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(err.message, "Must provide either 'hash', 'sql', or set 'all': true");
    assert_eq!(stack.store.db_size().await?, 1);
    Ok(())
}

#[tokio::test]
async fn delete_by_short_hash_uses_the_hash_as_given() -> ApiResult<()> {
    let stack = memory_stack();

    let reply = admin(&stack)
        .delete_cache(DeleteCacheRequest::by_hash("abcdef1234567890"))
        .await?;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body.message, "Cache not found");
    assert_eq!(reply.body.key.as_deref(), Some("abcdef1234567890"));

    stack.store.set("abcdef1234567890", "[]", None).await?;
    let reply = admin(&stack)
        .delete_cache(DeleteCacheRequest::by_hash("abcdef1234567890"))
        .await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body.key.as_deref(), Some("abcdef1234567890"));
    assert_eq!(stack.store.db_size().await?, 0);
    Ok(())
}

#[tokio::test]
async fn delete_all_flushes_every_namespace() -> ApiResult<()> {
    let stack = memory_stack();
    let record = stats_with_history("select * from sales", fixed_day(), &[(0, 5)]);
    seed_candidate(&stack, record, 30.0).await?;
    stack.store.set("session:abc", "not ours", None).await?;
    stack.store.list_push(PREWARM_QUEUE_KEY, "{}").await?;

    let before = stack.store.db_size().await?;
    let query = DeleteCacheRequest {
        all: Some(FlexibleBool::Text("TRUE".to_string())),
        ..DeleteCacheRequest::default()
    };
    let reply = admin(&stack)
        .delete_cache(DeleteCacheRequest::merge(None, query))
        .await?;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body.message, "All cache cleared successfully");
    assert_eq!(reply.body.keys_deleted, Some(before));
    assert_eq!(stack.store.db_size().await?, 0);
    Ok(())
}

#[tokio::test]
async fn clear_pattern_reports_matches() -> ApiResult<()> {
    let stack = memory_stack();
    for day in 0..3 {
        let record = stats_with_history(&format!("select {}", day), fixed_day(), &[(0, 1)]);
        stack.cache.put(&record.query_hash.clone(), &record).await?;
    }
    stack.store.set("session:abc", "kept", None).await?;

    let reply = admin(&stack)
        .clear_pattern(ClearPatternRequest::pattern("query:stats:*"))
        .await?;
    assert!(reply.body.success);
    assert_eq!(reply.body.keys_deleted, 3);
    assert_eq!(reply.body.message, "Cleared 3 keys matching pattern: query:stats:*");

    let none = admin(&stack)
        .clear_pattern(ClearPatternRequest::pattern("query:stats:*"))
        .await?;
    assert_eq!(none.body.keys_deleted, 0);
    assert_eq!(none.body.message, "No keys found matching pattern: query:stats:*");
    assert_eq!(stack.store.db_size().await?, 1);
    Ok(())
}

#[tokio::test]
async fn clear_pattern_accepts_unclosed_class() -> ApiResult<()> {
    let stack = memory_stack();
    stack.store.set("query:[", "literal", None).await?;
    stack.store.set("query:a", "1", None).await?;

    let reply = admin(&stack)
        .clear_pattern(ClearPatternRequest::pattern("query:["))
        .await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body.keys_deleted, 0);

    let reply = admin(&stack)
        .clear_pattern(ClearPatternRequest::pattern("query:[ab"))
        .await?;
    assert_eq!(reply.body.keys_deleted, 1);
    assert!(stack.store.exists("query:[").await?);
    Ok(())
}

#[tokio::test]
async fn clear_pattern_requires_pattern_unless_clear_all() -> ApiResult<()> {
    let stack = memory_stack();
    stack.store.set("a", "1", None).await?;

    let err = admin(&stack)
        .clear_pattern(ClearPatternRequest::default())
        .await
        .expect_err("missing pattern should fail");
    assert_eq!(err.code, ErrorCode::MissingField);
    assert_eq!(err.message, "Pattern is required (or use clearAll: true)");

    let reply = admin(&stack)
        .clear_pattern(ClearPatternRequest {
            pattern: None,
            clear_all: true,
        })
        .await?;
    assert_eq!(reply.body.message, "All cache cleared successfully");
    assert_eq!(reply.body.keys_deleted, 1);
    Ok(())
}

#[tokio::test]
async fn prewarm_top_n_skips_candidates_without_stats() -> ApiResult<()> {
    let stack = memory_stack();
    let today = fixed_day();
    let h1 = seed_candidate(&stack, stats_with_history("select h1", today, &[(0, 9)]), 50.0).await?;
    let h2 = compute_cache_key_on("select h2", None, today);
    seed_rank_only(&stack, &h2, 30.0).await?;
    seed_candidate(&stack, stats_with_history("select h3", today, &[(0, 1)]), 10.0).await?;

    let reply = admin(&stack).prewarm(PrewarmRequest::top_n(2)).await?;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body.message, "Queued 1 queries for pre-warming");
    assert_eq!(reply.body.queries.len(), 1);
    assert_eq!(reply.body.queries[0].hash, h1.short());
    assert_eq!(reply.body.queries[0].status, "queued");
    assert_eq!(stack.scheduler.queue_len().await?, 1);
    Ok(())
}

#[tokio::test]
async fn prewarm_top_n_with_no_stats_queues_nothing() -> ApiResult<()> {
    let stack = memory_stack();
    let today = fixed_day();
    seed_rank_only(&stack, &compute_cache_key_on("select h1", None, today), 50.0).await?;
    seed_rank_only(&stack, &compute_cache_key_on("select h2", None, today), 30.0).await?;

    let reply = admin(&stack).prewarm(PrewarmRequest::top_n(2)).await?;
    assert_eq!(reply.body.message, "Queued 0 queries for pre-warming");
    assert!(reply.body.queries.is_empty());
    assert_eq!(stack.scheduler.queue_len().await?, 0);
    Ok(())
}

#[tokio::test]
async fn prewarm_by_hashes_keeps_request_order() -> ApiResult<()> {
    let stack = memory_stack();
    let today = fixed_day();
    let a = seed_candidate(&stack, stats_with_history("select a", today, &[(0, 2)]), 5.0).await?;
    let b = seed_candidate(&stack, stats_with_history("select b", today, &[(0, 2)]), 80.0).await?;

    let reply = admin(&stack)
        .prewarm(PrewarmRequest::hashes([a.as_str(), b.as_str(), a.as_str()]))
        .await?;
    let hashes: Vec<&str> = reply.body.queries.iter().map(|q| q.hash.as_str()).collect();
    assert_eq!(hashes, vec![a.short(), b.short(), a.short()]);
    assert_eq!(stack.scheduler.queue_len().await?, 3);

    let first = stack.scheduler.dequeue().await?.expect("queue should have an item");
    assert_eq!(first.query_hash, a);
    Ok(())
}

#[tokio::test]
async fn prewarm_skips_hashes_that_are_not_cache_keys() -> ApiResult<()> {
    let stack = memory_stack();
    let seeded = seed_candidate(
        &stack,
        stats_with_history("select seeded", fixed_day(), &[(0, 2)]),
        25.0,
    )
    .await?;

    let reply = admin(&stack)
        .prewarm(PrewarmRequest::hashes([seeded.as_str(), "abcdef1234567890"]))
        .await?;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body.message, "Queued 1 queries for pre-warming");
    assert_eq!(reply.body.queries.len(), 1);
    assert_eq!(reply.body.queries[0].hash, seeded.short());
    assert_eq!(stack.scheduler.queue_len().await?, 1);
    Ok(())
}

#[tokio::test]
async fn prewarm_without_target_is_bad_request() {
    let stack = memory_stack();
    let err = admin(&stack)
        .prewarm(PrewarmRequest::default())
        .await
        .expect_err("empty request should fail");
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(err.message, "Must provide either queryHashes array or topN number");
}

#[tokio::test]
async fn prewarm_plan_reports_selection() -> ApiResult<()> {
    let stack = memory_stack();
    let today = fixed_day();
    let hot = seed_candidate(
        &stack,
        stats_with_history("select hot", today, &[(0, 4), (1, 3), (2, 2)]),
        60.0,
    )
    .await?;
    let cached = seed_candidate(
        &stack,
        stats_with_history("select cached", today, &[(0, 4), (1, 3)]),
        55.0,
    )
    .await?;
    stack.cache.put_result(&cached, &sample_rows(1), None).await?;

    let reply = admin(&stack).prewarm_plan(today).await?;
    assert!(reply.body.success);
    assert_eq!(reply.body.count, 1);
    assert_eq!(reply.body.candidates[0].query_hash, hot);
    assert_eq!(reply.body.excluded.len(), 1);
    assert!(reply.body.excluded[0].is_cached);
    assert_eq!(reply.body.message, "These queries would be pre-warmed if job runs now");
    Ok(())
}
