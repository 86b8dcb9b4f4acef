//! Timezone-aware date helpers
//!
//! Day offsets and calendar phrases are computed on calendar dates in the
//! device timezone, never on raw 24h durations.

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike,
};
use chrono_tz::Tz;

/// Accepted layouts for timestamps without an offset
const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Parse a source timestamp into the device timezone
///
/// Timestamps with an explicit offset (`Z`, `+hh:mm`) are converted.
/// Timestamps without one keep their wall-clock time and are placed in `tz`.
pub fn normalize_timestamp(raw: &str, tz: Tz) -> Option<DateTime<Tz>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&tz));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&tz));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(|d| d.and_time(NaiveTime::MIN))
        })?;

    // DST gaps have no local representation; shift forward an hour like clocks do
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
}

/// Signed calendar-day offset of `date` from `today` (positive = future)
#[inline]
pub fn days_from_today(date: &DateTime<Tz>, today: NaiveDate) -> i64 {
    (date.date_naive() - today).num_days()
}

/// Calendar days elapsed since `date` (positive = past)
#[inline]
pub fn days_to_today(date: &DateTime<Tz>, today: NaiveDate) -> i64 {
    -days_from_today(date, today)
}

/// Human calendar phrase: "today", "tomorrow", "on Friday", "last Monday", ...
pub fn calendar(date: &DateTime<Tz>, today: NaiveDate) -> String {
    let weekday = date.format("%A");
    match days_from_today(date, today) {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        -1 => "yesterday".to_string(),
        2..=6 => format!("on {}", weekday),
        -6..=-2 => format!("last {}", weekday),
        _ => format!("on {}, {} {}", weekday, date.format("%B"), ordinal(date.day())),
    }
}

/// Clock time in 12-hour form, e.g. "3:05 PM"
pub fn clock_time(date: &DateTime<Tz>) -> String {
    let (pm, hour) = date.hour12();
    format!("{}:{:02} {}", hour, date.minute(), if pm { "PM" } else { "AM" })
}

/// Last representable instant of the date's calendar day
pub fn end_of_day(date: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = date.timezone();
    let last = date.date_naive().and_time(NaiveTime::MIN) + Duration::days(1)
        - Duration::milliseconds(1);
    tz.from_local_datetime(&last).latest().unwrap_or(*date)
}

/// Start of the UTC hour containing the instant
///
/// Bucketing on UTC keeps the repeated local hour of a DST fall-back apart.
pub fn start_of_hour(date: &DateTime<Tz>) -> NaiveDateTime {
    let utc = date.naive_utc();
    utc.date().and_time(NaiveTime::from_hms_opt(utc.hour(), 0, 0).unwrap_or(NaiveTime::MIN))
}

fn ordinal(day: u32) -> String {
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", day, suffix)
}
