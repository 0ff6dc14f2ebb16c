//! Snapshot staleness detection.
//!
//! The data source is refreshed on user action, so a tab left open keeps
//! showing an old snapshot. This module decides when that snapshot is old
//! enough to warrant a notice.
//!
//! # Clock injection
//! All functions accept a `now: DateTime<Utc>` parameter rather than calling
//! `Utc::now()` internally, which keeps the checks deterministic in tests.

use chrono::{DateTime, Utc};

/// Whole minutes between `refreshed_at` and `now`, clamped at zero for
/// timestamps in the future.
pub fn age_minutes(refreshed_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (now - refreshed_at).num_minutes().max(0) as u64
}

/// Returns `true` if the snapshot is older than `max_age_minutes` at `now`.
///
/// Staleness is strictly greater than the threshold:
///   age > max_age_minutes  →  stale
///   age == max_age_minutes →  not stale
pub fn is_stale_at(refreshed_at: DateTime<Utc>, max_age_minutes: u64, now: DateTime<Utc>) -> bool {
    age_minutes(refreshed_at, now) > max_age_minutes
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// A fixed "now" used across all tests: 2024-05-01 13:00:00 UTC.
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, 0).unwrap()
    }

    #[test]
    fn test_snapshot_5_minutes_old_is_not_stale() {
        assert!(!is_stale_at(at(12, 55), 15, fixed_now()));
    }

    #[test]
    fn test_snapshot_exactly_at_threshold_is_not_stale() {
        assert!(
            !is_stale_at(at(12, 45), 15, fixed_now()),
            "age == threshold must not be stale (strictly greater than)"
        );
    }

    #[test]
    fn test_snapshot_one_minute_past_threshold_is_stale() {
        assert!(is_stale_at(at(12, 44), 15, fixed_now()));
    }

    #[test]
    fn test_future_timestamp_has_zero_age() {
        assert_eq!(age_minutes(at(13, 30), fixed_now()), 0);
        assert!(!is_stale_at(at(13, 30), 0, fixed_now()));
    }

    #[test]
    fn test_same_snapshot_stale_under_tight_threshold_not_under_loose() {
        let refreshed = at(12, 30);
        assert!(is_stale_at(refreshed, 20, fixed_now()));
        assert!(!is_stale_at(refreshed, 60, fixed_now()));
    }
}
