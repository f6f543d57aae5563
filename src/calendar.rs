//! Day keys, windows and durations
//!
//! Timestamps stay strings until they are needed; anything that fails to parse
//! yields `None` and the caller drops the record.

use crate::config::DayBucketing;
use crate::error::MetricsError;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc};

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339, offsets without a colon (`-0400`, as HealthKit emits), and
/// offset-less timestamps which are read as UTC.
pub fn parse_timestamp(ts: &str) -> Option<DateTime<FixedOffset>> {
    let ts = ts.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt);
    }
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Parse the leading `YYYY-MM-DD` of a date or timestamp string
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    let head = value.trim().get(..10)?;
    NaiveDate::parse_from_str(head, DAY_FORMAT).ok()
}

/// Parse a strict `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Result<NaiveDate, MetricsError> {
    NaiveDate::parse_from_str(value.trim(), DAY_FORMAT)
        .map_err(|e| MetricsError::DateParseError(format!("{value:?}: {e}")))
}

/// Calendar day a timestamp belongs to under the given bucketing mode
pub fn day_key(timestamp: &str, bucketing: &DayBucketing) -> Option<NaiveDate> {
    match bucketing.offset() {
        None => parse_day(timestamp),
        Some(offset) => parse_timestamp(timestamp).map(|dt| dt.with_timezone(&offset).date_naive()),
    }
}

/// UTC calendar day of a timestamp
pub fn utc_day(timestamp: &str) -> Option<NaiveDate> {
    parse_timestamp(timestamp).map(|dt| dt.with_timezone(&Utc).date_naive())
}

/// Minutes from `start` to `end`, floored at zero.
///
/// `None` when either bound fails to parse.
pub fn minutes_between(start: &str, end: &str) -> Option<f64> {
    let start = parse_timestamp(start)?;
    let end = parse_timestamp(end)?;
    let millis = (end - start).num_milliseconds();
    Some((millis as f64 / 60_000.0).max(0.0))
}

/// Format a day as `YYYY-MM-DD`
pub fn format_day(date: NaiveDate) -> String {
    date.format(DAY_FORMAT).to_string()
}

/// Contiguous run of calendar days ending on `end`, both endpoints included
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DayWindow {
    /// Window covering `end - days` through `end`
    pub fn ending(end: NaiveDate, days: u32) -> Self {
        let start = end
            .checked_sub_signed(Duration::days(i64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days in the window
    pub fn len(&self) -> usize {
        ((self.end - self.start).num_days() + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of `date` in the window, oldest first
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        if date < self.start || date > self.end {
            return None;
        }
        Some((date - self.start).num_days() as usize)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.index_of(date).is_some()
    }

    /// Every day of the window, oldest first
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take(self.len())
    }
}
