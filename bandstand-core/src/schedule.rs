//! Schedule resolution: who is on stage right now

use crate::{Clock, Error, PerformanceSlot, Result, SystemClock, TimeOfDay};
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Timelike, Utc};
use std::ops::Range;

/// Default venue offset (UTC+09:00)
const DEFAULT_UTC_OFFSET_SECS: i32 = 9 * 3600;

/// How much of the timetable the host page shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Every slot
    #[default]
    Expand,
    /// The previous, current and next slot only
    Windowed,
}

/// Resolver configuration
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Offset of the venue's local time from UTC
    pub utc_offset: FixedOffset,
    /// Visible window mode
    pub display_mode: DisplayMode,
}

impl ResolverConfig {
    /// Builds a configuration for a venue `minutes` east of UTC
    pub fn with_utc_offset_minutes(minutes: i32) -> Result<Self> {
        let utc_offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or(Error::InvalidUtcOffset(minutes))?;
        Ok(Self {
            utc_offset,
            ..Self::default()
        })
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            utc_offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix()),
            display_mode: DisplayMode::default(),
        }
    }
}

/// An instant projected onto the venue's calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleQuery {
    /// Venue-local calendar date
    pub date: NaiveDate,
    /// Venue-local time of day, truncated to the minute
    pub time: TimeOfDay,
}

impl ScheduleQuery {
    /// Creates a query for an explicit venue-local date and minute
    pub fn new(date: NaiveDate, time: TimeOfDay) -> Self {
        Self { date, time }
    }

    /// Converts an instant to the venue's local date and minute of day
    pub fn at(now: DateTime<Utc>, offset: &FixedOffset) -> Self {
        let local = now.with_timezone(offset);
        // hour < 24 and minute < 60 always hold for a chrono time
        let minutes = (local.hour() * 60 + local.minute()) as u16;
        Self {
            date: local.date_naive(),
            time: TimeOfDay(minutes),
        }
    }
}

/// Overall state of the event at the queried instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleStatus {
    /// The timetable has no slots for the event day
    NoSlots,
    /// The queried date is not the event date
    NotToday,
    /// Event day, before the first slot
    NotStarted,
    /// A slot is on stage
    Performing,
    /// Event day, between two slots
    Break,
    /// Event day, after the last slot
    Finished,
}

/// The changeover between two consecutive slots.
///
/// `is_current` follows `end(previous) <= now < start(next)`, so on the
/// last minute of the previous slot the gap is already current while that
/// slot is still reported as performing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    /// Index of the slot before the gap
    pub previous: usize,
    /// Index of the slot after the gap
    pub next: usize,
    /// `start(next) - end(previous)`; zero when the slots fall on different dates
    pub minutes: i32,
    /// Whether `end(previous) <= now < start(next)` on the slots' date
    pub is_current: bool,
}

impl Gap {
    /// Only positive gaps get a break row
    pub fn is_rendered(&self) -> bool {
        self.minutes > 0
    }
}

/// Render-ready view of the timetable at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleView {
    pub status: ScheduleStatus,
    /// First slot in timetable order containing the queried minute
    pub active_slot_index: Option<usize>,
    pub is_break: bool,
    /// First slot in timetable order starting after the queried minute
    pub next_slot_index: Option<usize>,
    /// Slot indices the host page should show
    pub visible_window: Range<usize>,
    /// One entry per consecutive slot pair
    pub gaps: Vec<Gap>,
}

impl ScheduleView {
    /// Slots inside the visible window
    pub fn visible_slots<'a>(&self, slots: &'a [PerformanceSlot]) -> &'a [PerformanceSlot] {
        slots.get(self.visible_window.clone()).unwrap_or_default()
    }

    /// The gap currently being sat through, if any
    pub fn current_gap(&self) -> Option<&Gap> {
        self.gaps.iter().find(|gap| gap.is_current)
    }

    /// Minutes from the queried instant to the start of the next slot on the same date
    pub fn minutes_until_next(&self, slots: &[PerformanceSlot], query: &ScheduleQuery) -> Option<i32> {
        let next = slots.get(self.next_slot_index?)?;
        (next.date == query.date).then(|| next.start.minutes_since(query.time))
    }
}

/// Resolves the timetable at the given instant.
///
/// Slots are scanned in order rather than searched, so an unsorted list still
/// resolves. When a minute lies inside two slots (`end(i) == start(i + 1)`),
/// the earlier slot in the list wins.
pub fn resolve(
    slots: &[PerformanceSlot],
    event_date: NaiveDate,
    query: &ScheduleQuery,
    mode: DisplayMode,
) -> ScheduleView {
    let active = slots.iter().position(|s| s.contains(query.date, query.time));
    let next = slots
        .iter()
        .position(|s| (s.date, s.start) > (query.date, query.time));

    let status = match active {
        Some(_) => ScheduleStatus::Performing,
        None if slots.is_empty() => ScheduleStatus::NoSlots,
        None if query.date != event_date => ScheduleStatus::NotToday,
        None => {
            let event_slots = slots.iter().filter(|s| s.date == event_date);
            let first_start = event_slots.clone().map(|s| s.start).min();
            let last_end = event_slots.map(|s| s.end).max();
            match (first_start, last_end) {
                (Some(first), _) if query.time < first => ScheduleStatus::NotStarted,
                (_, Some(last)) if query.time > last => ScheduleStatus::Finished,
                (Some(_), Some(_)) => ScheduleStatus::Break,
                _ => ScheduleStatus::NoSlots,
            }
        }
    };

    let gaps = slots
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            let (prev, next) = (&pair[0], &pair[1]);
            let same_day = prev.date == next.date;
            let minutes = if same_day {
                next.start.minutes_since(prev.end)
            } else {
                0
            };
            Gap {
                previous: i,
                next: i + 1,
                minutes,
                is_current: same_day
                    && prev.date == query.date
                    && prev.end <= query.time
                    && query.time < next.start,
            }
        })
        .collect();

    let anchor = active.or(next).or_else(|| {
        (status == ScheduleStatus::Finished).then(|| slots.len().saturating_sub(1))
    });
    let visible_window = match (mode, anchor) {
        (DisplayMode::Windowed, Some(anchor)) => {
            anchor.saturating_sub(1)..(anchor + 2).min(slots.len())
        }
        _ => 0..slots.len(),
    };

    ScheduleView {
        status,
        active_slot_index: active,
        is_break: status == ScheduleStatus::Break,
        next_slot_index: next,
        visible_window,
        gaps,
    }
}

/// Timetable bound to an event date, venue offset and clock
pub struct ScheduleResolver {
    slots: Vec<PerformanceSlot>,
    event_date: NaiveDate,
    config: ResolverConfig,
    clock: Box<dyn Clock>,
}

impl ScheduleResolver {
    /// Creates a resolver reading the system clock
    pub fn new(slots: Vec<PerformanceSlot>, event_date: NaiveDate, config: ResolverConfig) -> Self {
        Self {
            slots,
            event_date,
            config,
            clock: Box::new(SystemClock),
        }
    }

    /// Replaces the clock, e.g. with a [`crate::FixedClock`] for a simulated instant
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// The timetable in its original order
    pub fn slots(&self) -> &[PerformanceSlot] {
        &self.slots
    }

    /// The event day used for the not-today and break checks
    pub fn event_date(&self) -> NaiveDate {
        self.event_date
    }

    /// Venue offset and display mode
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// The current instant on the venue's calendar
    pub fn query(&self) -> ScheduleQuery {
        ScheduleQuery::at(self.clock.now(), &self.config.utc_offset)
    }

    /// Resolves the timetable at the clock's current instant
    pub fn resolve(&self) -> ScheduleView {
        self.resolve_query(&self.query())
    }

    /// Reads the clock once and returns the query together with its view
    pub fn snapshot(&self) -> (ScheduleQuery, ScheduleView) {
        let query = self.query();
        let view = self.resolve_query(&query);
        (query, view)
    }

    /// Resolves the timetable at an explicit instant
    pub fn resolve_at(&self, now: DateTime<Utc>) -> ScheduleView {
        self.resolve_query(&ScheduleQuery::at(now, &self.config.utc_offset))
    }

    fn resolve_query(&self, query: &ScheduleQuery) -> ScheduleView {
        let view = resolve(&self.slots, self.event_date, query, self.config.display_mode);
        tracing::debug!(
            date = %query.date,
            time = %query.time,
            status = ?view.status,
            active = ?view.active_slot_index,
            next = ?view.next_slot_index,
            "resolved schedule"
        );
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_date, FixedClock};
    use chrono::TimeZone;
    use proptest::prelude::*;

    const DAY: &str = "2024-12-21";

    fn slot(name: &str, start: &str, end: &str) -> PerformanceSlot {
        PerformanceSlot::parse(DAY, name, start, end).unwrap()
    }

    fn at(time: &str) -> ScheduleQuery {
        ScheduleQuery::new(parse_date(DAY).unwrap(), time.parse().unwrap())
    }

    fn day() -> NaiveDate {
        parse_date(DAY).unwrap()
    }

    fn two_slots() -> Vec<PerformanceSlot> {
        vec![slot("Opening", "15:30", "15:35"), slot("Jazz Band", "15:35", "16:00")]
    }

    fn lineup() -> Vec<PerformanceSlot> {
        vec![
            slot("Opening", "13:00", "13:10"),
            slot("Big Band", "13:10", "13:40"),
            slot("Combo A", "13:50", "14:20"),
            slot("Combo B", "14:30", "15:00"),
            slot("Finale", "15:10", "15:40"),
        ]
    }

    #[test]
    fn test_active_slot_inside_bounds() {
        let view = resolve(&two_slots(), day(), &at("15:32"), DisplayMode::Expand);
        assert_eq!(view.status, ScheduleStatus::Performing);
        assert_eq!(view.active_slot_index, Some(0));
        assert!(!view.is_break);
        assert_eq!(view.next_slot_index, Some(1));
    }

    #[test]
    fn test_shared_boundary_first_match_wins() {
        let resolver = ScheduleResolver::new(two_slots(), day(), ResolverConfig::default());
        // 15:35:30 in UTC+09:00
        let now = Utc.with_ymd_and_hms(2024, 12, 21, 6, 35, 30).unwrap();
        let view = resolver.resolve_at(now);
        assert_eq!(view.active_slot_index, Some(0));
        assert!(!view.is_break);
    }

    #[test]
    fn test_before_first_slot() {
        let view = resolve(&two_slots(), day(), &at("14:00"), DisplayMode::Expand);
        assert_eq!(view.status, ScheduleStatus::NotStarted);
        assert_eq!(view.active_slot_index, None);
        assert_eq!(view.next_slot_index, Some(0));
        assert!(!view.is_break);
    }

    #[test]
    fn test_after_last_slot() {
        let view = resolve(&lineup(), day(), &at("16:00"), DisplayMode::Expand);
        assert_eq!(view.status, ScheduleStatus::Finished);
        assert_eq!(view.next_slot_index, None);
        assert!(!view.is_break);
    }

    #[test]
    fn test_break_between_slots() {
        let view = resolve(&lineup(), day(), &at("13:45"), DisplayMode::Expand);
        assert_eq!(view.status, ScheduleStatus::Break);
        assert!(view.is_break);
        assert_eq!(view.active_slot_index, None);
        assert_eq!(view.next_slot_index, Some(2));
        assert_eq!(view.minutes_until_next(&lineup(), &at("13:45")), Some(5));

        let gap = view.current_gap().unwrap();
        assert_eq!((gap.previous, gap.next, gap.minutes), (1, 2, 10));
    }

    #[test]
    fn test_last_minute_of_slot_before_break() {
        let slots = lineup();
        let view = resolve(&slots, day(), &at("13:40"), DisplayMode::Expand);
        assert_eq!(view.status, ScheduleStatus::Performing);
        assert_eq!(view.active_slot_index, Some(1));
        assert!(!view.is_break);
        assert_eq!(view.next_slot_index, Some(2));

        let gap = view.current_gap().unwrap();
        assert_eq!((gap.previous, gap.next), (1, 2));
        assert!(gap.is_rendered());

        let view = resolve(&slots, day(), &at("13:41"), DisplayMode::Expand);
        assert_eq!(view.status, ScheduleStatus::Break);
        assert_eq!(view.current_gap().map(|g| g.next), Some(2));

        // The first minute of the next slot closes the gap
        let view = resolve(&slots, day(), &at("13:50"), DisplayMode::Expand);
        assert_eq!(view.active_slot_index, Some(2));
        assert!(view.current_gap().is_none());
    }

    #[test]
    fn test_other_day_is_not_today() {
        let before = ScheduleQuery::new(day().pred_opt().unwrap(), "13:30".parse().unwrap());
        let view = resolve(&lineup(), day(), &before, DisplayMode::Expand);
        assert_eq!(view.status, ScheduleStatus::NotToday);
        assert_eq!(view.active_slot_index, None);
        assert_eq!(view.next_slot_index, Some(0));

        let after = ScheduleQuery::new(day().succ_opt().unwrap(), "13:30".parse().unwrap());
        let view = resolve(&lineup(), day(), &after, DisplayMode::Expand);
        assert_eq!(view.status, ScheduleStatus::NotToday);
        assert_eq!(view.next_slot_index, None);
        assert!(view.current_gap().is_none());
    }

    #[test]
    fn test_empty_schedule() {
        let view = resolve(&[], day(), &at("13:30"), DisplayMode::Windowed);
        assert_eq!(view.status, ScheduleStatus::NoSlots);
        assert_eq!(view.active_slot_index, None);
        assert_eq!(view.next_slot_index, None);
        assert!(!view.is_break);
        assert_eq!(view.visible_window, 0..0);
        assert!(view.gaps.is_empty());
    }

    #[test]
    fn test_windowed_display() {
        let slots = lineup();

        let view = resolve(&slots, day(), &at("14:00"), DisplayMode::Windowed);
        assert_eq!(view.visible_window, 1..4);
        assert_eq!(view.visible_slots(&slots).len(), 3);

        let first = resolve(&slots, day(), &at("13:05"), DisplayMode::Windowed);
        assert_eq!(first.visible_window, 0..2);

        let last = resolve(&slots, day(), &at("15:20"), DisplayMode::Windowed);
        assert_eq!(last.visible_window, 3..5);

        let expanded = resolve(&slots, day(), &at("14:00"), DisplayMode::Expand);
        assert_eq!(expanded.visible_window, 0..5);
    }

    #[test]
    fn test_zero_length_gap_not_rendered() {
        let view = resolve(&two_slots(), day(), &at("15:00"), DisplayMode::Expand);
        assert_eq!(view.gaps.len(), 1);
        assert_eq!(view.gaps[0].minutes, 0);
        assert!(!view.gaps[0].is_rendered());
        assert!(!view.gaps[0].is_current);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let slots = lineup();
        let query = at("14:25");
        let first = resolve(&slots, day(), &query, DisplayMode::Windowed);
        let second = resolve(&slots, day(), &query, DisplayMode::Windowed);
        assert_eq!(first, second);
    }

    #[test]
    fn test_fixed_clock_uses_venue_offset() {
        // 2024-12-20 23:50 UTC is 2024-12-21 08:50 at UTC+09:00
        let now = Utc.with_ymd_and_hms(2024, 12, 20, 23, 50, 0).unwrap();
        let resolver = ScheduleResolver::new(lineup(), day(), ResolverConfig::default())
            .with_clock(FixedClock(now));

        let query = resolver.query();
        assert_eq!(query.date, day());
        assert_eq!(query.time.to_string(), "08:50");
        assert_eq!(resolver.resolve().status, ScheduleStatus::NotStarted);
    }

    #[test]
    fn test_utc_offset_config() {
        let config = ResolverConfig::with_utc_offset_minutes(-300).unwrap();
        assert_eq!(config.utc_offset.local_minus_utc(), -300 * 60);
        assert!(matches!(
            ResolverConfig::with_utc_offset_minutes(24 * 60),
            Err(Error::InvalidUtcOffset(_))
        ));
    }

    /// Builds a sorted same-day timetable from (length, gap-before) pairs starting at 10:00
    fn build_slots(blocks: &[(u16, u16)]) -> Vec<PerformanceSlot> {
        let mut cursor = 10 * 60;
        let mut slots = Vec::new();
        for (i, &(length, gap)) in blocks.iter().enumerate() {
            let start = cursor + gap;
            let end = start + length;
            slots.push(
                PerformanceSlot::new(
                    day(),
                    format!("Band {}", i),
                    TimeOfDay::from_minutes(start).unwrap(),
                    TimeOfDay::from_minutes(end).unwrap(),
                )
                .unwrap(),
            );
            cursor = end;
        }
        slots
    }

    proptest! {
        #[test]
        fn prop_inside_slot_is_active(
            blocks in prop::collection::vec((2u16..45, 1u16..20), 1..8),
            pick in any::<prop::sample::Index>(),
            offset in 1u16..59,
        ) {
            let slots = build_slots(&blocks);
            let i = pick.index(slots.len());
            let slot = &slots[i];
            // Strictly inside the slot
            let minute = slot.start.minutes() + 1 + offset % (slot.duration_minutes() - 1).max(1);
            prop_assume!(minute < slot.end.minutes());

            let query = ScheduleQuery::new(day(), TimeOfDay::from_minutes(minute).unwrap());
            let view = resolve(&slots, day(), &query, DisplayMode::Expand);
            prop_assert_eq!(view.active_slot_index, Some(i));
            prop_assert!(!view.is_break);
        }

        #[test]
        fn prop_between_slots_is_break(
            blocks in prop::collection::vec((1u16..45, 2u16..20), 2..8),
            pick in any::<prop::sample::Index>(),
            offset in 0u16..30,
        ) {
            let slots = build_slots(&blocks);
            let i = pick.index(slots.len() - 1);
            let (end, next_start) = (slots[i].end.minutes(), slots[i + 1].start.minutes());
            // Strictly between end(i) and start(i + 1)
            let minute = end + 1 + offset % (next_start - end - 1);

            let query = ScheduleQuery::new(day(), TimeOfDay::from_minutes(minute).unwrap());
            let view = resolve(&slots, day(), &query, DisplayMode::Expand);
            prop_assert!(view.is_break);
            prop_assert_eq!(view.active_slot_index, None);
            prop_assert_eq!(view.next_slot_index, Some(i + 1));
            prop_assert_eq!(view.current_gap().map(|g| g.next), Some(i + 1));
        }
    }
}
