//! Timetable files: an event date, its venue offset and the slot list

use crate::{PerformanceSlot, ResolverConfig, Result, ScheduleResolver};
use chrono::NaiveDate;
use std::io::Read;

/// A timetable as shipped alongside the event page
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Timetable {
    pub event_date: NaiveDate,
    /// Venue offset from UTC in minutes
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub slots: Vec<PerformanceSlot>,
}

fn default_utc_offset_minutes() -> i32 {
    ResolverConfig::default().utc_offset.local_minus_utc() / 60
}

impl Timetable {
    /// Parses a timetable from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a timetable from a JSON reader
    pub fn read<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Resolver configuration for this timetable's venue offset
    pub fn resolver_config(&self) -> Result<ResolverConfig> {
        ResolverConfig::with_utc_offset_minutes(self.utc_offset_minutes)
    }

    /// Builds a resolver on the system clock
    pub fn into_resolver(self) -> Result<ScheduleResolver> {
        let config = self.resolver_config()?;
        Ok(ScheduleResolver::new(self.slots, self.event_date, config))
    }
}
