//! Request and response types for the cache administration interface.
//!
//! Field names are camelCase on the wire.

use hotquery_core::PrewarmCriteria;
use hotquery_storage::{PlannedCandidate, PrewarmPlan, QueuedPrewarm};
use serde::{Deserialize, Serialize};

// ============================================================================
// FLEXIBLE FLAGS
// ============================================================================

/// A boolean flag that also accepts its string spelling.
///
/// Query strings only carry text, and some callers send `"true"` in JSON
/// bodies as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(untagged)]
pub enum FlexibleBool {
    Bool(bool),
    Text(String),
}

impl FlexibleBool {
    /// `true`, or the string `"true"` in any case.
    pub fn is_true(&self) -> bool {
        match self {
            FlexibleBool::Bool(value) => *value,
            FlexibleBool::Text(text) => text.trim().eq_ignore_ascii_case("true"),
        }
    }
}

impl From<bool> for FlexibleBool {
    fn from(value: bool) -> Self {
        FlexibleBool::Bool(value)
    }
}

// ============================================================================
// DELETE CACHE
// ============================================================================

/// Delete one cached result, or everything.
///
/// Accepted from a JSON body, the query string, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct DeleteCacheRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<FlexibleBool>,
}

impl DeleteCacheRequest {
    pub fn by_hash(hash: impl Into<String>) -> Self {
        Self {
            hash: Some(hash.into()),
            ..Self::default()
        }
    }

    pub fn by_sql(sql: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            sql: Some(sql.into()),
            user_id,
            ..Self::default()
        }
    }

    pub fn all() -> Self {
        Self {
            all: Some(FlexibleBool::Bool(true)),
            ..Self::default()
        }
    }

    /// Combine body and query-string fields. Non-empty body fields win;
    /// `all` is set if either side sets it.
    pub fn merge(body: Option<Self>, query: Self) -> Self {
        let body = body.unwrap_or_default();
        let all = if body.wants_all() || query.wants_all() {
            Some(FlexibleBool::Bool(true))
        } else {
            body.all.or(query.all)
        };
        Self {
            sql: prefer(body.sql, query.sql),
            user_id: prefer(body.user_id, query.user_id),
            hash: prefer(body.hash, query.hash),
            all,
        }
    }

    pub fn wants_all(&self) -> bool {
        self.all.as_ref().map(FlexibleBool::is_true).unwrap_or(false)
    }
}

fn prefer(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    non_empty(primary).or_else(|| non_empty(fallback))
}

/// Drop blank strings.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct DeleteCacheResponse {
    pub message: String,
    /// The resolved cache key, when a single entry was targeted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Keys removed by a full flush.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys_deleted: Option<u64>,
}

// ============================================================================
// CLEAR BY PATTERN
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ClearPatternRequest {
    /// Glob pattern over store keys, e.g. `query:stats:*`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default)]
    pub clear_all: bool,
}

impl ClearPatternRequest {
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            clear_all: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ClearPatternResponse {
    pub success: bool,
    pub message: String,
    pub keys_deleted: u64,
}

// ============================================================================
// PRE-WARM
// ============================================================================

/// Queue queries for pre-warming, either by hash or by rank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PrewarmRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_hashes: Option<Vec<String>>,
    #[serde(default, rename = "topN", skip_serializing_if = "Option::is_none")]
    pub top_n: Option<i64>,
}

impl PrewarmRequest {
    pub fn hashes<I, S>(hashes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            query_hashes: Some(hashes.into_iter().map(Into::into).collect()),
            top_n: None,
        }
    }

    pub fn top_n(n: i64) -> Self {
        Self {
            query_hashes: None,
            top_n: Some(n),
        }
    }
}

/// One queued query as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct QueuedQuery {
    /// Short display hash.
    pub hash: String,
    /// SQL preview.
    pub sql: String,
    pub score: f64,
    pub status: String,
}

impl From<QueuedPrewarm> for QueuedQuery {
    fn from(queued: QueuedPrewarm) -> Self {
        Self {
            hash: queued.hash,
            sql: queued.sql,
            score: queued.score,
            status: queued.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PrewarmResponse {
    pub message: String,
    pub queries: Vec<QueuedQuery>,
}

impl PrewarmResponse {
    pub fn from_queued(queued: Vec<QueuedPrewarm>) -> Self {
        Self {
            message: format!("Queued {} queries for pre-warming", queued.len()),
            queries: queued.into_iter().map(QueuedQuery::from).collect(),
        }
    }
}

/// Dry-run report of the automatic pre-warm selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PrewarmPlanResponse {
    pub success: bool,
    pub count: usize,
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<Object>))]
    pub candidates: Vec<PlannedCandidate>,
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<Object>))]
    pub excluded: Vec<PlannedCandidate>,
    pub message: String,
    pub criteria: PrewarmCriteria,
}

impl PrewarmPlanResponse {
    pub fn from_plan(plan: PrewarmPlan, message: impl Into<String>) -> Self {
        Self {
            success: true,
            count: plan.candidates.len(),
            candidates: plan.candidates,
            excluded: plan.excluded,
            message: message.into(),
            criteria: plan.criteria,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
