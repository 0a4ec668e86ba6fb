//! Query hashing.
//!
//! A [`CacheKey`] identifies one cached query result for one user on one UTC
//! calendar day. The day is part of the hashed text, so every key expires
//! naturally at midnight UTC: the same SQL asked tomorrow hashes differently.

use std::fmt;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::{SHORT_HASH_LEN, SQL_PREVIEW_CHARS, STATS_KEY_PREFIX};
use crate::error::{HotqueryError, HotqueryResult};

/// Length of a rendered cache key (SHA-256 as hex).
pub const CACHE_KEY_LEN: usize = 64;

/// Lowercase hex SHA-256 digest identifying a cached query result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CacheKey(String);

impl CacheKey {
    /// Parse a caller-supplied key.
    ///
    /// Accepts exactly 64 hex digits in either case and normalizes to
    /// lowercase so that lookups are case-insensitive.
    pub fn parse(raw: &str) -> HotqueryResult<Self> {
        let trimmed = raw.trim();
        if trimmed.len() != CACHE_KEY_LEN {
            return Err(HotqueryError::invalid_value(
                "hash",
                format!("expected {} hex characters, got {}", CACHE_KEY_LEN, trimmed.len()),
            ));
        }
        if !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(HotqueryError::invalid_value(
                "hash",
                "must contain only hexadecimal characters",
            ));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Wrap a digest produced by this module.
    fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened hash used in logs and reports.
    pub fn short(&self) -> &str {
        &self.0[..SHORT_HASH_LEN]
    }

    /// Store key of the statistics record for this hash.
    pub fn stats_key(&self) -> String {
        format!("{}{}", STATS_KEY_PREFIX, self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize SQL text for hashing: trim, lower-case, collapse whitespace.
pub fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compute the cache key for `sql` as seen by `user_id` today (UTC).
pub fn compute_cache_key(sql: &str, user_id: Option<&str>) -> CacheKey {
    compute_cache_key_on(sql, user_id, Utc::now().date_naive())
}

/// Compute the cache key for `sql` as seen by `user_id` on `date`.
///
/// An empty user id hashes the same as no user id.
pub fn compute_cache_key_on(sql: &str, user_id: Option<&str>, date: NaiveDate) -> CacheKey {
    let normalized = normalize_sql(sql);
    let day = date.format("%Y-%m-%d");
    let composite = match user_id.filter(|u| !u.is_empty()) {
        Some(user) => format!("{}:{}:{}", user, normalized, day),
        None => format!("{}:{}", normalized, day),
    };

    let mut hasher = Sha256::new();
    hasher.update(composite.as_bytes());
    CacheKey::from_digest(&hasher.finalize())
}

/// First characters of a query followed by an ellipsis, for reports.
pub fn sql_preview(sql: &str) -> String {
    let head: String = sql.chars().take(SQL_PREVIEW_CHARS).collect();
    format!("{}...", head)
}

// =============================================================================
// TESTS
// =============================================================================
