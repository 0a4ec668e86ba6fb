//! OpenAPI schema document for the admin interface types.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::types::*;
use hotquery_core::{CacheKey, PrewarmCriteria};

/// OpenAPI components for the cache administration boundary.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "hotquery admin",
        description = "Cache administration and pre-warm queue"
    ),
    components(schemas(
        ApiError,
        ErrorCode,
        CacheKey,
        FlexibleBool,
        DeleteCacheRequest,
        DeleteCacheResponse,
        ClearPatternRequest,
        ClearPatternResponse,
        PrewarmRequest,
        PrewarmResponse,
        QueuedQuery,
        PrewarmPlanResponse,
        PrewarmCriteria,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lists_admin_types() {
        let doc = ApiDoc::openapi();
        let schemas = doc
            .components
            .expect("components should be present")
            .schemas;
        for name in ["ApiError", "DeleteCacheRequest", "PrewarmRequest", "PrewarmPlanResponse"] {
            assert!(schemas.contains_key(name), "missing schema {}", name);
        }
    }
}
