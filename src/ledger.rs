//! Occupancy bookkeeping.
//!
//! The ledger records which faculty member, room and section holds which
//! (day, period). It is the only source consulted for double-booking checks.
//! `reserve` does not re-check freedom; callers test with `is_free` first.

use crate::data::{Day, Period};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Atomic unit of occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeKey {
    pub day: Day,
    pub period: Period,
}

impl TimeKey {
    #[inline]
    pub fn new(day: Day, period: Period) -> Self {
        Self { day, period }
    }
}

/// Inclusive run of periods within a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeriodRange {
    pub start: Period,
    pub end: Period,
}

impl PeriodRange {
    #[inline]
    pub fn new(start: Period, end: Period) -> Self {
        debug_assert!(start <= end, "range start {start} after end {end}");
        Self { start, end }
    }

    #[inline]
    pub fn with_span(start: Period, span: u8) -> Self {
        Self::new(start, start + span - 1)
    }

    #[inline]
    pub fn span(&self) -> u32 {
        u32::from(self.end - self.start) + 1
    }

    #[inline]
    pub fn periods(&self) -> std::ops::RangeInclusive<Period> {
        self.start..=self.end
    }

    #[inline]
    pub fn overlaps(&self, other: &PeriodRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    #[inline]
    pub fn contains(&self, other: &PeriodRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for PeriodRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}-P{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Faculty,
    Room,
    Section,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Faculty => write!(f, "faculty"),
            EntityKind::Room => write!(f, "room"),
            EntityKind::Section => write!(f, "section"),
        }
    }
}

type OccupancySet = HashMap<String, HashSet<TimeKey>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccupancyLedger {
    faculty: OccupancySet,
    room: OccupancySet,
    section: OccupancySet,
}

impl OccupancyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn set(&self, kind: EntityKind) -> &OccupancySet {
        match kind {
            EntityKind::Faculty => &self.faculty,
            EntityKind::Room => &self.room,
            EntityKind::Section => &self.section,
        }
    }

    #[inline]
    fn set_mut(&mut self, kind: EntityKind) -> &mut OccupancySet {
        match kind {
            EntityKind::Faculty => &mut self.faculty,
            EntityKind::Room => &mut self.room,
            EntityKind::Section => &mut self.section,
        }
    }

    pub fn is_free(&self, kind: EntityKind, id: &str, day: Day, range: PeriodRange) -> bool {
        match self.set(kind).get(id) {
            None => true,
            Some(held) => range
                .periods()
                .all(|period| !held.contains(&TimeKey::new(day, period))),
        }
    }

    pub fn reserve(&mut self, kind: EntityKind, id: &str, day: Day, range: PeriodRange) {
        let held = self.set_mut(kind).entry(id.to_string()).or_default();
        held.extend(range.periods().map(|period| TimeKey::new(day, period)));
    }

    pub fn release(&mut self, kind: EntityKind, id: &str, day: Day, range: PeriodRange) {
        let set = self.set_mut(kind);
        if let Some(held) = set.get_mut(id) {
            for period in range.periods() {
                held.remove(&TimeKey::new(day, period));
            }
            if held.is_empty() {
                set.remove(id);
            }
        }
    }
}
