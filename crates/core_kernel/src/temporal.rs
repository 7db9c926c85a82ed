//! Date windows and the business timezone
//!
//! Every dashboard query is parameterized by a half-open window `[start, end)`.
//! Trend comparisons need the window of equal length that immediately precedes
//! it, and "this month" needs calendar boundaries in the business timezone,
//! so both live here rather than being recomputed ad hoc by each metric.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid range: start {start} must be before end {end}")]
    InvalidRange { start: String, end: String },

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Local time {0} does not exist in the business timezone")]
    NonexistentLocalTime(String),

    #[error("Date out of range: {0}")]
    OutOfRange(String),
}

/// Timezone used to resolve calendar boundaries (day, month)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Timezone::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Parses an IANA timezone name such as `Europe/Oslo`
    pub fn parse(name: &str) -> Result<Self, TemporalError> {
        Tz::from_str(name)
            .map(Timezone)
            .map_err(|_| TemporalError::UnknownTimezone(name.to_string()))
    }

    /// Calendar date of `instant` in this timezone
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.0).date_naive()
    }

    /// Gets the start of day (00:00) in this timezone as UTC
    ///
    /// On DST transitions the earliest valid instant is used.
    pub fn start_of_day(&self, date: NaiveDate) -> Result<DateTime<Utc>, TemporalError> {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| TemporalError::OutOfRange(date.to_string()))?;
        midnight
            .and_local_timezone(self.0)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| TemporalError::NonexistentLocalTime(midnight.to_string()))
    }

    /// The calendar month containing `instant`, as a UTC window
    pub fn calendar_month(&self, instant: DateTime<Utc>) -> Result<DateRange, TemporalError> {
        let local = self.local_date(instant);
        let first = NaiveDate::from_ymd_opt(local.year(), local.month(), 1)
            .ok_or_else(|| TemporalError::OutOfRange(local.to_string()))?;
        let next = if local.month() == 12 {
            NaiveDate::from_ymd_opt(local.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(local.year(), local.month() + 1, 1)
        }
        .ok_or_else(|| TemporalError::OutOfRange(local.to_string()))?;

        DateRange::new(self.start_of_day(first)?, self.start_of_day(next)?)
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::UTC)
    }
}

/// A half-open time window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    /// Creates a window; `start` must be strictly before `end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TemporalError> {
        if start >= end {
            return Err(TemporalError::InvalidRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    /// The `days`-long window ending at `end`
    pub fn trailing_days(end: DateTime<Utc>, days: u32) -> Result<Self, TemporalError> {
        Self::new(end - Duration::days(i64::from(days)), end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    /// The window of identical length ending where this one starts
    pub fn preceding(&self) -> Self {
        Self {
            start: self.start - self.duration(),
            end: self.start,
        }
    }
}
