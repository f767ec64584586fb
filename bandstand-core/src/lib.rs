//! Bandstand Core Library
//!
//! This library provides the data model and pure logic behind the club's
//! live pages: resolving which band is on stage from a timetable and a clock,
//! and keeping a draggable logo overlay on-frame for the photo booth.

pub mod clock;
pub mod overlay;
pub mod schedule;
pub mod slot;
#[cfg(feature = "serde")]
pub mod timetable;

pub use clock::{Clock, FixedClock, SystemClock};
pub use overlay::{
    default_variants, validate_aspect_ratio, DragSession, OverlayGeometry, OverlayState,
    OverlayVariant, SizeRange,
};
pub use schedule::{
    resolve, DisplayMode, Gap, ResolverConfig, ScheduleQuery, ScheduleResolver, ScheduleStatus,
    ScheduleView,
};
pub use slot::{parse_date, PerformanceSlot, TimeOfDay};
#[cfg(feature = "serde")]
pub use timetable::Timetable;

/// Result type for bandstand-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for bandstand-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid time of day: {0:?}, expected HH:MM")]
    InvalidTime(String),

    #[error("Invalid date: {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Slot {name:?} ends at {end} before it starts at {start}")]
    InvertedSlot {
        name: String,
        start: TimeOfDay,
        end: TimeOfDay,
    },

    #[error("Invalid frame aspect ratio: {0}")]
    InvalidAspectRatio(f64),

    #[error("Invalid size range: [{min}, {max}]")]
    InvalidSizeRange { min: f64, max: f64 },

    #[error("Invalid UTC offset: {0} minutes")]
    InvalidUtcOffset(i32),

    #[error("Unknown overlay variant: {0}")]
    UnknownVariant(String),

    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
