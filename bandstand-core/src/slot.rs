//! Performance slot data structures

use crate::{Error, Result};
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// Minutes in a day
const MINUTES_PER_DAY: u16 = 24 * 60;

/// A wall-clock time of day at minute resolution, stored as minutes since midnight.
///
/// Comparing integers instead of `HH:MM` strings keeps ordering correct across
/// hour boundaries and single-digit hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct TimeOfDay(pub(crate) u16);

impl TimeOfDay {
    /// Creates a time of day from hours and minutes
    pub fn new(hour: u16, minute: u16) -> Result<Self> {
        if hour >= 24 || minute >= 60 {
            return Err(Error::InvalidTime(format!("{}:{:02}", hour, minute)));
        }
        Ok(Self(hour * 60 + minute))
    }

    /// Creates a time of day from minutes since midnight
    pub fn from_minutes(minutes: u16) -> Result<Self> {
        if minutes >= MINUTES_PER_DAY {
            return Err(Error::InvalidTime(format!("{} minutes", minutes)));
        }
        Ok(Self(minutes))
    }

    /// Minutes since midnight
    pub fn minutes(self) -> u16 {
        self.0
    }

    /// Hour of the day, 0 to 23
    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    /// Minute of the hour, 0 to 59
    pub fn minute(self) -> u16 {
        self.0 % 60
    }

    /// Signed distance in minutes from `earlier` to `self`
    pub fn minutes_since(self, earlier: TimeOfDay) -> i32 {
        i32::from(self.0) - i32::from(earlier.0)
    }
}

impl FromStr for TimeOfDay {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidTime(s.to_string());

        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(hour) || hour.len() > 2 || !all_digits(minute) || minute.len() != 2 {
            return Err(invalid());
        }

        let hour: u16 = hour.parse().map_err(|_| invalid())?;
        let minute: u16 = minute.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

/// Parses a `YYYY-MM-DD` calendar date
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| Error::InvalidDate(s.to_string()))
}

/// A single performer's block on the timetable
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "SlotRecord")
)]
pub struct PerformanceSlot {
    /// Calendar date the slot takes place on
    pub date: NaiveDate,
    /// Performer or group label
    pub name: String,
    /// First minute on stage (inclusive)
    pub start: TimeOfDay,
    /// Last minute on stage (inclusive)
    pub end: TimeOfDay,
}

impl PerformanceSlot {
    /// Creates a new slot, rejecting one that ends before it starts
    pub fn new(date: NaiveDate, name: impl Into<String>, start: TimeOfDay, end: TimeOfDay) -> Result<Self> {
        let name = name.into();
        if end < start {
            return Err(Error::InvertedSlot { name, start, end });
        }
        Ok(Self {
            date,
            name,
            start,
            end,
        })
    }

    /// Creates a slot from its textual timetable form
    pub fn parse(date: &str, name: impl Into<String>, start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date(date)?, name, start.parse()?, end.parse()?)
    }

    /// Checks if this slot is on stage at the given date and minute.
    /// Both bounds are inclusive.
    pub fn contains(&self, date: NaiveDate, time: TimeOfDay) -> bool {
        self.date == date && self.start <= time && time <= self.end
    }

    /// Returns the length of this slot in minutes
    pub fn duration_minutes(&self) -> u16 {
        self.end.minutes().saturating_sub(self.start.minutes())
    }
}

/// Wire form of a slot, validated into [`PerformanceSlot`] on deserialization
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct SlotRecord {
    date: NaiveDate,
    name: String,
    start: TimeOfDay,
    end: TimeOfDay,
}

#[cfg(feature = "serde")]
impl TryFrom<SlotRecord> for PerformanceSlot {
    type Error = Error;

    fn try_from(record: SlotRecord) -> Result<Self> {
        Self::new(record.date, record.name, record.start, record.end)
    }
}
