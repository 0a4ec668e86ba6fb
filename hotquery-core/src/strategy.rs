//! Result lifetime classification.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_RESULT_TTL_SECS, HOURLY_RESULT_TTL_SECS};

/// Functions whose value changes within a day.
const TIME_OF_DAY_FUNCTIONS: &[&str] = &[
    "current_timestamp",
    "current_time",
    "now(",
    "getdate(",
    "sysdatetime(",
];

/// Functions whose value depends on the current date or time.
const DYNAMIC_DATE_FUNCTIONS: &[&str] = &[
    "current_date",
    "current_timestamp",
    "current_time",
    "localtime",
    "localtimestamp",
    "now(",
    "curdate(",
    "curtime(",
    "sysdate(",
    "utc_date",
    "utc_time",
    "utc_timestamp",
    "getdate(",
    "getutcdate(",
    "sysdatetime(",
    "sysutcdatetime(",
];

/// How long a query's results stay valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum CacheStrategy {
    /// Deterministic query; may be kept without expiry once persistent.
    Static,
    /// Depends on the current date.
    Daily,
    /// Depends on the time of day.
    Hourly,
}

impl CacheStrategy {
    /// Classify a query by the date and time functions it calls.
    ///
    /// `force_dynamic` treats the query as date-dependent regardless of its text.
    pub fn classify(sql: &str, force_dynamic: bool) -> Self {
        if force_dynamic {
            return CacheStrategy::Daily;
        }
        let lower = sql.to_lowercase();
        if TIME_OF_DAY_FUNCTIONS.iter().any(|f| lower.contains(f)) {
            CacheStrategy::Hourly
        } else if DYNAMIC_DATE_FUNCTIONS.iter().any(|f| lower.contains(f)) {
            CacheStrategy::Daily
        } else {
            CacheStrategy::Static
        }
    }

    /// Lifetime imposed by the strategy itself; `None` for static queries.
    pub fn fixed_ttl(&self) -> Option<Duration> {
        match self {
            CacheStrategy::Static => None,
            CacheStrategy::Daily => Some(Duration::from_secs(DEFAULT_RESULT_TTL_SECS)),
            CacheStrategy::Hourly => Some(Duration::from_secs(HOURLY_RESULT_TTL_SECS)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStrategy::Static => "static",
            CacheStrategy::Daily => "daily",
            CacheStrategy::Hourly => "hourly",
        }
    }
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_static() {
        assert_eq!(
            CacheStrategy::classify("SELECT * FROM sales WHERE day = '2024-01-01'", false),
            CacheStrategy::Static
        );
    }

    #[test]
    fn test_classify_hourly() {
        assert_eq!(
            CacheStrategy::classify("select * from gps where ts > NOW() - interval '1 hour'", false),
            CacheStrategy::Hourly
        );
        assert_eq!(
            CacheStrategy::classify("select CURRENT_TIMESTAMP", false),
            CacheStrategy::Hourly
        );
    }

    #[test]
    fn test_classify_daily() {
        assert_eq!(
            CacheStrategy::classify("select * from sales where day = current_date", false),
            CacheStrategy::Daily
        );
        assert_eq!(
            CacheStrategy::classify("select * from sales", true),
            CacheStrategy::Daily
        );
    }

    #[test]
    fn test_fixed_ttl() {
        assert_eq!(CacheStrategy::Static.fixed_ttl(), None);
        assert_eq!(
            CacheStrategy::Hourly.fixed_ttl(),
            Some(Duration::from_secs(3_600))
        );
        assert_eq!(
            CacheStrategy::Daily.fixed_ttl(),
            Some(Duration::from_secs(86_400))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(CacheStrategy::Hourly.to_string(), "hourly");
        assert_eq!(
            serde_json::to_string(&CacheStrategy::Static).expect("serialize should succeed"),
            "\"static\""
        );
    }
}
