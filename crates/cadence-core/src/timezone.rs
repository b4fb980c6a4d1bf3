use crate::error::CoreError;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

/// Parse an IANA timezone name
pub fn parse_timezone(timezone: &str) -> Result<Tz, CoreError> {
    Tz::from_str(timezone).map_err(|_| CoreError::InvalidTimezone(timezone.to_string()))
}

/// Map a local wall-clock time to UTC.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant. Times that
/// do not exist (spring-forward gap) move forward one hour.
pub fn resolve_local<Z: TimeZone>(timezone: &Z, local: NaiveDateTime) -> DateTime<Utc> {
    match timezone.from_local_datetime(&local).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => timezone
            .from_local_datetime(&(local + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| local.and_utc()),
    }
}

/// UTC bounds `[start, end)` of a local calendar day
pub fn day_bounds<Z: TimeZone>(timezone: &Z, day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = resolve_local(timezone, day.and_time(chrono::NaiveTime::MIN));
    let next_day = day.succ_opt().unwrap_or(day);
    let end = resolve_local(timezone, next_day.and_time(chrono::NaiveTime::MIN));
    (start, end)
}

/// The local calendar date of an instant
pub fn local_date<Z: TimeZone>(timezone: &Z, at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(timezone).date_naive()
}
