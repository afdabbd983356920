//! Daily energy aggregation.
//!
//! Owns the calendar-day bucketing convention: days are bucketed in UTC,
//! with inclusive bounds `[00:00:00, 23:59:59]`. Totals are recomputed on
//! demand from the measurement log rather than maintained incrementally,
//! so the aggregate can never drift from `store::sum_energy`.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use sqlx::PgPool;

use crate::store;

// ---

/// Inclusive UTC bounds of one calendar day.
pub fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    // ---
    let start = Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN));
    let end = start + Duration::seconds(24 * 60 * 60 - 1);
    (start, end)
}

/// Total energy recorded for a device on one UTC calendar day.
///
/// Returns 0.0 for a day with no measurements.
pub async fn daily_total(
    pool: &PgPool,
    device_pk: i32,
    day: NaiveDate,
) -> Result<f64, sqlx::Error> {
    // ---
    let (start, end) = day_bounds(day);
    store::sum_energy(pool, device_pk, start, end).await
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_day_bounds_cover_full_day() {
        // ---
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let (start, end) = day_bounds(day);

        assert_eq!(start.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2024-01-01T23:59:59+00:00");
        assert_eq!(end.hour(), 23);
        assert_eq!(end.minute(), 59);
        assert_eq!(end.second(), 59);
    }

    #[test]
    fn test_day_bounds_are_inclusive_of_edges() {
        // ---
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let (start, end) = day_bounds(day);

        let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let last = Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap();
        let next_day = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        assert!(first >= start && first <= end);
        assert!(last >= start && last <= end);
        assert!(next_day > end, "next midnight must fall outside the bucket");
    }

    #[test]
    fn test_day_bounds_handle_leap_day() {
        // ---
        let day = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let (start, end) = day_bounds(day);

        assert_eq!(start.date_naive(), day);
        assert_eq!(end.date_naive(), day);
    }
}
