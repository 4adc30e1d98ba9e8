//! Calendar helpers for the daily file cycle.
//!
//! The source publishes one file per US trading day, keyed by the date in
//! US Eastern time. All functions here are pure; "now" is always passed in
//! so callers and tests control the clock.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;

/// Time zone the source publishes in
pub const SOURCE_TIME_ZONE: Tz = chrono_tz::America::New_York;

/// Format a calendar date as a YYYYMMDD date key.
pub fn format_date_key(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Parse a YYYYMMDD date key back into a calendar date.
pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y%m%d").ok()
}

/// Yesterday's calendar date in the given zone: project `now` into the
/// zone first, then step back one day.
pub fn yesterday_in(tz: Tz, now: DateTime<Utc>) -> NaiveDate {
    days_ago_in(tz, now, 1)
}

/// The calendar date `days` days before `now` in the given zone.
pub fn days_ago_in(tz: Tz, now: DateTime<Utc>, days: i64) -> NaiveDate {
    now.with_timezone(&tz).date_naive() - Duration::days(days)
}

/// Saturday/Sunday test; the source has no files for weekend dates.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
