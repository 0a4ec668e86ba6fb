//! Pre-warm scoring.
//!
//! A query's score blends how often it runs, how expensive it is, and how
//! recently and consistently it is served from cache. Idle days decay the
//! score geometrically so that abandoned queries drop out of the candidate
//! ranking without an explicit cleanup.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::PrewarmCriteria;
use crate::constants::{RECENT_WINDOW_DAYS, SCORE_DECAY_PER_IDLE_DAY};
use crate::stats::QueryStatsRecord;

// ============================================================================
// SCORE WEIGHTS
// ============================================================================

const FREQUENCY_WEIGHT: f64 = 0.20;
const DURATION_WEIGHT: f64 = 0.15;
const ROW_COUNT_WEIGHT: f64 = 0.10;
const HIT_WEIGHT: f64 = 0.20;
const RECENT_ACTIVITY_WEIGHT: f64 = 0.25;
const CONSISTENCY_WEIGHT: f64 = 0.10;

const FREQUENCY_SATURATION: f64 = 100.0;
const DURATION_SATURATION_MS: f64 = 5_000.0;
const ROW_COUNT_SATURATION: f64 = 100_000.0;
const HIT_SATURATION: f64 = 50.0;
const RECENT_HIT_SATURATION: f64 = 20.0;

const PERSIST_MAX_IDLE_DAYS: u32 = 7;
const PERSIST_MIN_ACTIVE_DAYS: u32 = 3;
const PERSIST_MIN_AVG_HITS: f64 = 2.0;

// ============================================================================
// HISTORY METRICS
// ============================================================================

/// Days of the recent window, newest first.
fn recent_window(today: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    (0..RECENT_WINDOW_DAYS).map(move |offset| today - Duration::days(offset))
}

/// Total hits over the last seven days, today included.
pub fn recent_hits(stats: &QueryStatsRecord, today: NaiveDate) -> u64 {
    recent_window(today).map(|day| stats.hits_on(day)).sum()
}

/// Days with at least one hit over the last seven days.
pub fn active_days(stats: &QueryStatsRecord, today: NaiveDate) -> u32 {
    recent_window(today)
        .filter(|day| stats.hits_on(*day) > 0)
        .count() as u32
}

/// Average hits per active day in the recent window, 0 when idle.
pub fn avg_hits_per_active_day(stats: &QueryStatsRecord, today: NaiveDate) -> f64 {
    let days = active_days(stats, today);
    if days == 0 {
        return 0.0;
    }
    recent_hits(stats, today) as f64 / days as f64
}

/// Drop history entries older than `keep_days` before `today`.
pub fn prune_history(stats: &mut QueryStatsRecord, today: NaiveDate, keep_days: i64) {
    let cutoff = today - Duration::days(keep_days);
    stats.daily_hit_history.retain(|day, _| *day >= cutoff);
}

/// Whole days since the last cache hit.
///
/// A query that has never been hit counts one idle day once it has run.
pub fn consecutive_days_without_hits(stats: &QueryStatsRecord, today: NaiveDate) -> u32 {
    match stats.last_cache_hit {
        None if stats.total_executions > 0 => 1,
        None => 0,
        Some(last_hit) => (today - last_hit.date_naive()).num_days().max(0) as u32,
    }
}

// ============================================================================
// SCORE AND PERSISTENCE
// ============================================================================

fn saturate(value: f64, ceiling: f64) -> f64 {
    (value / ceiling).min(1.0)
}

/// Pre-warm score in `[0, 100]`.
///
/// Uses the record's stored `consecutive_days_no_hits` for decay.
pub fn prewarm_score(stats: &QueryStatsRecord, today: NaiveDate) -> f64 {
    let base = FREQUENCY_WEIGHT * saturate(stats.total_executions as f64, FREQUENCY_SATURATION)
        + DURATION_WEIGHT * saturate(stats.avg_duration, DURATION_SATURATION_MS)
        + ROW_COUNT_WEIGHT * saturate(stats.avg_row_count, ROW_COUNT_SATURATION)
        + HIT_WEIGHT * saturate(stats.total_hits as f64, HIT_SATURATION)
        + RECENT_ACTIVITY_WEIGHT * saturate(recent_hits(stats, today) as f64, RECENT_HIT_SATURATION)
        + CONSISTENCY_WEIGHT * (active_days(stats, today) as f64 / RECENT_WINDOW_DAYS as f64);

    let decay = SCORE_DECAY_PER_IDLE_DAY.powi(stats.consecutive_days_no_hits as i32);
    (base * 100.0 * decay).clamp(0.0, 100.0)
}

/// Whether the query's results should be cached without expiry.
pub fn should_persist(stats: &QueryStatsRecord, today: NaiveDate) -> bool {
    if stats.consecutive_days_no_hits >= PERSIST_MAX_IDLE_DAYS {
        return false;
    }
    if active_days(stats, today) < PERSIST_MIN_ACTIVE_DAYS {
        return false;
    }
    avg_hits_per_active_day(stats, today) >= PERSIST_MIN_AVG_HITS
}

// ============================================================================
// PRE-WARM ELIGIBILITY
// ============================================================================

/// Why a candidate was left out of an automatic pre-warm run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ExclusionReason {
    #[serde(rename = "already cached")]
    AlreadyCached,
    #[serde(rename = "score too low")]
    ScoreTooLow,
    #[serde(rename = "not recent")]
    NotRecent,
    #[serde(rename = "insufficient hits")]
    InsufficientHits,
    #[serde(rename = "too few active days")]
    TooFewActiveDays,
    #[serde(rename = "low daily average")]
    LowDailyAverage,
}

impl ExclusionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExclusionReason::AlreadyCached => "already cached",
            ExclusionReason::ScoreTooLow => "score too low",
            ExclusionReason::NotRecent => "not recent",
            ExclusionReason::InsufficientHits => "insufficient hits",
            ExclusionReason::TooFewActiveDays => "too few active days",
            ExclusionReason::LowDailyAverage => "low daily average",
        }
    }
}

impl std::fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of checking one stats record against [`PrewarmCriteria`].
#[derive(Debug, Clone, PartialEq)]
pub struct Eligibility {
    pub recent_hits: u64,
    pub active_days: u32,
    pub avg_hits_per_active_day: f64,
    /// Every criterion the record fails; empty when eligible.
    pub reasons: Vec<ExclusionReason>,
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        self.reasons.is_empty()
    }
}

impl PrewarmCriteria {
    /// Check a stats record against these thresholds as of `today`.
    pub fn evaluate(&self, stats: &QueryStatsRecord, today: NaiveDate) -> Eligibility {
        let recent = recent_hits(stats, today);
        let active = active_days(stats, today);
        let avg = avg_hits_per_active_day(stats, today);

        let mut reasons = Vec::new();
        if stats.prewarm_score <= self.min_score {
            reasons.push(ExclusionReason::ScoreTooLow);
        }
        if stats.consecutive_days_no_hits >= self.max_consecutive_days_no_hits {
            reasons.push(ExclusionReason::NotRecent);
        }
        if recent < self.min_recent_hits {
            reasons.push(ExclusionReason::InsufficientHits);
        }
        if active < self.min_active_days {
            reasons.push(ExclusionReason::TooFewActiveDays);
        }
        if avg < self.min_avg_hits_per_active_day {
            reasons.push(ExclusionReason::LowDailyAverage);
        }

        Eligibility {
            recent_hits: recent,
            active_days: active,
            avg_hits_per_active_day: avg,
            reasons,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
