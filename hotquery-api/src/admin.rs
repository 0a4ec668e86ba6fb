//! Cache administration interface.
//!
//! The operations route handlers call: delete one entry, delete by pattern,
//! flush everything, queue pre-warms, and preview the automatic pre-warm
//! selection. Every request is validated before the store is touched.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{NaiveDate, Utc};
use hotquery_core::{compute_cache_key_on, CacheKey, HotqueryError, PrewarmCriteria, ValidationError};
use hotquery_storage::{PrewarmScheduler, ResultCache};
use serde::Serialize;

use crate::constants::{
    MSG_ALL_CLEARED, MSG_CACHE_DELETED, MSG_CACHE_NOT_FOUND, MSG_DELETE_TARGET_REQUIRED,
    MSG_PATTERN_REQUIRED, MSG_PLAN_PREVIEW, MSG_PREWARM_TARGET_REQUIRED,
};
use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::types::{
    non_empty, ClearPatternRequest, ClearPatternResponse, DeleteCacheRequest,
    DeleteCacheResponse, PrewarmPlanResponse, PrewarmRequest, PrewarmResponse,
};

// ============================================================================
// REPLY
// ============================================================================

/// A successful admin reply: a status code and a JSON body.
///
/// "Not found" is a reply rather than an error because its body carries the
/// resolved key.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminReply<T> {
    pub status: StatusCode,
    pub body: T,
}

impl<T> AdminReply<T> {
    pub fn ok(body: T) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    pub fn not_found(body: T) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body,
        }
    }
}

impl<T: Serialize> IntoResponse for AdminReply<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// ============================================================================
// ADMIN SERVICE
// ============================================================================

/// Boundary operations over the result cache and pre-warm scheduler.
#[derive(Debug, Clone)]
pub struct CacheAdmin {
    cache: ResultCache,
    scheduler: PrewarmScheduler,
    criteria: PrewarmCriteria,
}

enum DeleteTarget {
    All,
    /// A store key: a computed or normalized cache key, or a hash as given.
    Key(String),
}

impl CacheAdmin {
    pub fn new(cache: ResultCache, scheduler: PrewarmScheduler) -> Self {
        Self {
            cache,
            scheduler,
            criteria: PrewarmCriteria::default(),
        }
    }

    /// Use non-default thresholds for [`prewarm_plan`](Self::prewarm_plan).
    pub fn with_criteria(mut self, criteria: PrewarmCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn criteria(&self) -> &PrewarmCriteria {
        &self.criteria
    }

    // ------------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------------

    /// Delete one cached result, or flush the store when `all` is set.
    pub async fn delete_cache(
        &self,
        request: DeleteCacheRequest,
    ) -> ApiResult<AdminReply<DeleteCacheResponse>> {
        self.delete_cache_on(request, Utc::now().date_naive()).await
    }

    /// As [`delete_cache`](Self::delete_cache), hashing `sql` for `today`.
    pub async fn delete_cache_on(
        &self,
        request: DeleteCacheRequest,
        today: NaiveDate,
    ) -> ApiResult<AdminReply<DeleteCacheResponse>> {
        let key = match resolve_delete_target(request, today)? {
            DeleteTarget::All => {
                let keys_deleted = self.cache.flush_all().await?;
                return Ok(AdminReply::ok(DeleteCacheResponse {
                    message: MSG_ALL_CLEARED.to_string(),
                    key: None,
                    keys_deleted: Some(keys_deleted),
                }));
            }
            DeleteTarget::Key(key) => key,
        };

        if self.cache.delete_entry(&key).await? {
            Ok(AdminReply::ok(DeleteCacheResponse {
                message: MSG_CACHE_DELETED.to_string(),
                key: Some(key),
                keys_deleted: None,
            }))
        } else {
            tracing::debug!(key = %key, "Cache entry not found");
            Ok(AdminReply::not_found(DeleteCacheResponse {
                message: MSG_CACHE_NOT_FOUND.to_string(),
                key: Some(key),
                keys_deleted: None,
            }))
        }
    }

    // ------------------------------------------------------------------------
    // Pattern clear
    // ------------------------------------------------------------------------

    /// Delete every key matching a glob pattern, or flush with `clearAll`.
    pub async fn clear_pattern(
        &self,
        request: ClearPatternRequest,
    ) -> ApiResult<AdminReply<ClearPatternResponse>> {
        if request.clear_all {
            let keys_deleted = self.cache.flush_all().await?;
            return Ok(AdminReply::ok(ClearPatternResponse {
                success: true,
                message: MSG_ALL_CLEARED.to_string(),
                keys_deleted,
            }));
        }

        let pattern = non_empty(request.pattern).ok_or_else(|| {
            ApiError::new(ErrorCode::MissingField, MSG_PATTERN_REQUIRED)
                .with_details(serde_json::json!({ "error": "Missing pattern parameter" }))
        })?;

        let keys_deleted = self.cache.delete_by_pattern(&pattern).await?;
        let message = if keys_deleted == 0 {
            format!("No keys found matching pattern: {}", pattern)
        } else {
            format!("Cleared {} keys matching pattern: {}", keys_deleted, pattern)
        };
        Ok(AdminReply::ok(ClearPatternResponse {
            success: true,
            message,
            keys_deleted,
        }))
    }

    // ------------------------------------------------------------------------
    // Pre-warm
    // ------------------------------------------------------------------------

    /// Queue queries for pre-warming by hash list or by top-N rank.
    pub async fn prewarm(&self, request: PrewarmRequest) -> ApiResult<AdminReply<PrewarmResponse>> {
        let queued = match validate_prewarm(request)? {
            PrewarmTarget::Hashes(keys) => self.scheduler.request_prewarm(&keys).await?,
            PrewarmTarget::TopN(n) => self.scheduler.request_prewarm_top_n(n).await?,
        };
        Ok(AdminReply::ok(PrewarmResponse::from_queued(queued)))
    }

    /// Report what an automatic pre-warm run would select as of `today`.
    pub async fn prewarm_plan(&self, today: NaiveDate) -> ApiResult<AdminReply<PrewarmPlanResponse>> {
        let plan = self.scheduler.plan(&self.criteria, today).await?;
        Ok(AdminReply::ok(PrewarmPlanResponse::from_plan(plan, MSG_PLAN_PREVIEW)))
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

fn resolve_delete_target(request: DeleteCacheRequest, today: NaiveDate) -> ApiResult<DeleteTarget> {
    if request.wants_all() {
        return Ok(DeleteTarget::All);
    }
    if let Some(hash) = non_empty(request.hash) {
        // Well-formed keys are matched case-insensitively; anything else is deleted as given.
        let key = CacheKey::parse(&hash).map(|k| k.to_string()).unwrap_or(hash);
        return Ok(DeleteTarget::Key(key));
    }
    if let Some(sql) = non_empty(request.sql) {
        let user_id = non_empty(request.user_id);
        let key = compute_cache_key_on(&sql, user_id.as_deref(), today);
        return Ok(DeleteTarget::Key(key.to_string()));
    }
    Err(ApiError::validation_failed(MSG_DELETE_TARGET_REQUIRED))
}

/// A validated pre-warm request.
#[derive(Debug, Clone, PartialEq)]
pub enum PrewarmTarget {
    Hashes(Vec<CacheKey>),
    TopN(usize),
}

/// Check that exactly one of `queryHashes` (non-empty) or `topN` (positive)
/// is present.
///
/// Entries that are not cache keys can have no statistics, so they are
/// dropped here the same way the scheduler skips stats-less hashes.
pub fn validate_prewarm(request: PrewarmRequest) -> ApiResult<PrewarmTarget> {
    match (request.query_hashes, request.top_n) {
        (Some(_), Some(_)) => Err(HotqueryError::Validation(ValidationError::ConflictingFields {
            field_a: "queryHashes".to_string(),
            field_b: "topN".to_string(),
            reason: "provide only one".to_string(),
        })
        .into()),
        (None, None) => Err(ApiError::validation_failed(MSG_PREWARM_TARGET_REQUIRED)),
        (Some(hashes), None) => {
            if hashes.is_empty() {
                return Err(ApiError::invalid_range("queryHashes", "1 entry"));
            }
            let keys = hashes
                .iter()
                .filter_map(|hash| match CacheKey::parse(hash) {
                    Ok(key) => Some(key),
                    Err(_) => {
                        tracing::debug!(hash = %hash, "Not a cache key, not queued");
                        None
                    }
                })
                .collect();
            Ok(PrewarmTarget::Hashes(keys))
        }
        (None, Some(n)) => {
            if n <= 0 {
                return Err(ApiError::invalid_range("topN", 1));
            }
            Ok(PrewarmTarget::TopN(n as usize))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use hotquery_core::compute_cache_key;

    fn key_of(sql: &str) -> String {
        compute_cache_key(sql, None).to_string()
    }

    #[test]
    fn test_prewarm_requires_exactly_one_target() {
        let err = validate_prewarm(PrewarmRequest::default()).expect_err("empty should fail");
        assert_eq!(err.message, MSG_PREWARM_TARGET_REQUIRED);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let both = PrewarmRequest {
            query_hashes: Some(vec![key_of("select 1")]),
            top_n: Some(3),
        };
        let err = validate_prewarm(both).expect_err("both should fail");
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn test_prewarm_rejects_bad_values() {
        let err = validate_prewarm(PrewarmRequest::top_n(0)).expect_err("zero should fail");
        assert_eq!(err.code, ErrorCode::InvalidRange);

        let err = validate_prewarm(PrewarmRequest::top_n(-4)).expect_err("negative should fail");
        assert_eq!(err.code, ErrorCode::InvalidRange);

        let err = validate_prewarm(PrewarmRequest::hashes(Vec::<String>::new()))
            .expect_err("empty list should fail");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

    }

    #[test]
    fn test_prewarm_drops_malformed_hashes() {
        let valid = key_of("select 1");
        let target = validate_prewarm(PrewarmRequest::hashes([
            "abcdef1234567890",
            valid.as_str(),
            "not-a-hash",
        ]))
        .expect("malformed entries should not fail the request");
        assert_eq!(
            target,
            PrewarmTarget::Hashes(vec![CacheKey::parse(&valid).expect("valid key")])
        );

        let target = validate_prewarm(PrewarmRequest::hashes(["not-a-hash"]))
            .expect("malformed entries should not fail the request");
        assert_eq!(target, PrewarmTarget::Hashes(Vec::new()));
    }

    #[test]
    fn test_prewarm_normalizes_hashes() {
        let upper = key_of("select 1").to_ascii_uppercase();
        let target = validate_prewarm(PrewarmRequest::hashes([upper]))
            .expect("uppercase hash should validate");
        assert_eq!(
            target,
            PrewarmTarget::Hashes(vec![CacheKey::parse(&key_of("select 1")).expect("valid key")])
        );
    }

    #[test]
    fn test_delete_target_precedence() {
        let today = Utc::now().date_naive();
        let request = DeleteCacheRequest {
            all: Some(true.into()),
            hash: Some("garbage".to_string()),
            ..DeleteCacheRequest::default()
        };
        assert!(matches!(
            resolve_delete_target(request, today),
            Ok(DeleteTarget::All)
        ));

        let hash = key_of("select 9");
        let request = DeleteCacheRequest {
            hash: Some(hash.clone()),
            sql: Some("select 1".to_string()),
            ..DeleteCacheRequest::default()
        };
        match resolve_delete_target(request, today) {
            Ok(DeleteTarget::Key(key)) => assert_eq!(key, hash),
            _ => panic!("hash should take precedence over sql"),
        }
    }

    #[test]
    fn test_delete_target_hash_forms() {
        let today = Utc::now().date_naive();
        let hash = key_of("select 9");
        match resolve_delete_target(DeleteCacheRequest::by_hash(hash.to_ascii_uppercase()), today) {
            Ok(DeleteTarget::Key(key)) => assert_eq!(key, hash),
            _ => panic!("well-formed hash should resolve to its lowercase key"),
        }
        match resolve_delete_target(DeleteCacheRequest::by_hash("abcdef1234567890"), today) {
            Ok(DeleteTarget::Key(key)) => assert_eq!(key, "abcdef1234567890"),
            _ => panic!("short hash should be used as given"),
        }
    }

    #[test]
    fn test_delete_target_missing() {
        let err = resolve_delete_target(DeleteCacheRequest::default(), Utc::now().date_naive())
            .err()
            .expect("missing target should fail");
        assert_eq!(err.message, MSG_DELETE_TARGET_REQUIRED);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
