//! Immutable problem lookups and the mutable per-attempt scheduling state.

use crate::data::{
    ClassroomOption, CourseAssignment, CourseKey, Day, FacultyAvailabilityWindow, FacultyId,
    SchedulingInput, SubjectKind, TimetableSlot,
};
use crate::ledger::{EntityKind, OccupancyLedger, PeriodRange};
use crate::rules::SchedulingRules;
use itertools::Itertools;
use log::debug;
use std::collections::HashMap;

/// Read-only view of the problem shared by every attempt and individual.
#[derive(Debug, Clone)]
pub struct ProblemIndex {
    pub rules: SchedulingRules,
    pub courses: Vec<CourseAssignment>,
    /// Rooms in ascending capacity so the tightest fit is tried first.
    pub rooms: Vec<ClassroomOption>,
    course_lookup: HashMap<CourseKey, usize>,
    room_lookup: HashMap<String, usize>,
    availability: HashMap<FacultyId, Vec<(Day, PeriodRange)>>,
    windows: Vec<FacultyAvailabilityWindow>,
    faculty_theory_load: HashMap<FacultyId, u32>,
}

impl ProblemIndex {
    pub fn new(input: &SchedulingInput, rules: SchedulingRules) -> Self {
        let rooms: Vec<ClassroomOption> = input
            .rooms
            .iter()
            .cloned()
            .sorted_by(|a, b| a.capacity.cmp(&b.capacity).then_with(|| a.id.cmp(&b.id)))
            .collect();
        let course_lookup = input
            .courses
            .iter()
            .enumerate()
            .map(|(i, c)| (c.key(), i))
            .collect();
        let room_lookup = rooms
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
        let availability = input
            .availability
            .iter()
            .map(|w| {
                (
                    w.faculty_id.clone(),
                    (w.day, PeriodRange::new(w.start_period, w.end_period)),
                )
            })
            .into_group_map();
        let faculty_theory_load = input
            .courses
            .iter()
            .filter(|c| c.subject_kind == SubjectKind::Theory)
            .map(|c| (c.faculty_id.clone(), c.periods_per_week))
            .into_grouping_map()
            .sum();

        Self {
            rules,
            courses: input.courses.clone(),
            rooms,
            course_lookup,
            room_lookup,
            availability,
            windows: input.availability.clone(),
            faculty_theory_load,
        }
    }

    pub fn course(&self, idx: usize) -> &CourseAssignment {
        &self.courses[idx]
    }

    pub fn course_index(&self, key: &CourseKey) -> Option<usize> {
        self.course_lookup.get(key).copied()
    }

    pub fn room(&self, id: &str) -> Option<&ClassroomOption> {
        self.room_lookup.get(id).map(|&i| &self.rooms[i])
    }

    pub fn course_indices(&self, kind: SubjectKind) -> Vec<usize> {
        self.courses
            .iter()
            .enumerate()
            .filter(|(_, c)| c.subject_kind == kind)
            .map(|(i, _)| i)
            .collect()
    }

    /// Rooms of the matching kind and sufficient capacity, tightest first.
    pub fn candidate_rooms(&self, course: &CourseAssignment) -> Vec<&ClassroomOption> {
        self.rooms
            .iter()
            .filter(|r| room_fits(r, course))
            .collect()
    }

    /// A faculty member without any declared window is unrestricted.
    pub fn is_available(&self, faculty_id: &str, day: Day, range: PeriodRange) -> bool {
        match self.availability.get(faculty_id) {
            None => true,
            Some(windows) => windows
                .iter()
                .any(|(d, window)| *d == day && window.contains(&range)),
        }
    }

    pub fn availability_windows(&self) -> &[FacultyAvailabilityWindow] {
        &self.windows
    }

    pub fn has_declared_windows(&self, faculty_id: &str) -> bool {
        self.availability.contains_key(faculty_id)
    }

    pub fn faculty_theory_load(&self, faculty_id: &str) -> u32 {
        self.faculty_theory_load.get(faculty_id).copied().unwrap_or(0)
    }

    /// `ceil(weekly theory load / days) + buffer`, theory periods only.
    pub fn day_balance_cap(&self, faculty_id: &str, buffer: u32) -> u32 {
        let days = u32::from(self.rules.days_per_week.max(1));
        self.faculty_theory_load(faculty_id).div_ceil(days) + buffer
    }

    pub fn total_required_periods(&self, kind: SubjectKind) -> u32 {
        self.courses
            .iter()
            .filter(|c| c.subject_kind == kind)
            .map(|c| c.periods_per_week)
            .sum()
    }
}

#[inline]
pub fn room_fits(room: &ClassroomOption, course: &CourseAssignment) -> bool {
    room.kind == course.subject_kind && room.capacity >= course.student_count
}

/// Per-day counters, one vector slot per day of the week.
type DayLoads<K> = HashMap<K, Vec<u32>>;

fn bump<K: std::hash::Hash + Eq>(loads: &mut DayLoads<K>, key: K, day: Day, days: u8, delta: i64) {
    let row = loads.entry(key).or_insert_with(|| vec![0; usize::from(days)]);
    if let Some(cell) = row.get_mut(usize::from(day)) {
        *cell = (i64::from(*cell) + delta).max(0) as u32;
    }
}

fn read<K, Q>(loads: &DayLoads<K>, key: &Q, day: Day) -> u32
where
    K: std::borrow::Borrow<Q> + std::hash::Hash + Eq,
    Q: std::hash::Hash + Eq + ?Sized,
{
    loads
        .get(key)
        .and_then(|row| row.get(usize::from(day)).copied())
        .unwrap_or(0)
}

/// Mutable scheduling state owned by exactly one attempt or individual.
///
/// Cloning yields an independent checkpoint.
#[derive(Debug, Clone, Default)]
pub struct SchedulingContext {
    pub ledger: OccupancyLedger,
    subject_day_load: DayLoads<usize>,
    section_day_load: DayLoads<String>,
    faculty_theory_day_load: DayLoads<String>,
    /// Lab blocks per faculty and day, split into (early half, late half).
    lab_halves: HashMap<(String, Day), (u32, u32)>,
    placed: HashMap<usize, u32>,
    slots: Vec<TimetableSlot>,
    slot_courses: Vec<usize>,
    diagnostics: Vec<String>,
}

impl SchedulingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slots(&self) -> &[TimetableSlot] {
        &self.slots
    }

    /// Course index owning each slot, aligned with [`Self::slots`].
    pub fn slot_courses(&self) -> &[usize] {
        &self.slot_courses
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    pub fn diagnose(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!("{}", message);
        self.diagnostics.push(message);
    }

    pub fn periods_placed(&self, course_idx: usize) -> u32 {
        self.placed.get(&course_idx).copied().unwrap_or(0)
    }

    pub fn total_periods_placed(&self) -> u32 {
        self.placed.values().sum()
    }

    pub fn subject_load(&self, course_idx: usize, day: Day) -> u32 {
        read(&self.subject_day_load, &course_idx, day)
    }

    pub fn section_load(&self, section_id: &str, day: Day) -> u32 {
        read(&self.section_day_load, section_id, day)
    }

    pub fn faculty_theory_load(&self, faculty_id: &str, day: Day) -> u32 {
        read(&self.faculty_theory_day_load, faculty_id, day)
    }

    /// `(early, late)` lab blocks held by `faculty_id` on `day`.
    pub fn lab_halves(&self, faculty_id: &str, day: Day) -> (u32, u32) {
        self.lab_halves
            .get(&(faculty_id.to_string(), day))
            .copied()
            .unwrap_or((0, 0))
    }

    /// Records a new block for `course_idx`. The caller has already checked it.
    pub fn place(
        &mut self,
        problem: &ProblemIndex,
        course_idx: usize,
        room_id: &str,
        day: Day,
        range: PeriodRange,
    ) -> usize {
        let course = problem.course(course_idx);
        let slot = TimetableSlot {
            section_id: course.section_id.clone(),
            subject_id: course.subject_id.clone(),
            faculty_id: course.faculty_id.clone(),
            room_id: room_id.to_string(),
            day,
            start_period: range.start,
            end_period: range.end,
        };
        self.book(problem, course_idx, &slot);
        self.slots.push(slot);
        self.slot_courses.push(course_idx);
        self.slots.len() - 1
    }

    pub(crate) fn book(&mut self, problem: &ProblemIndex, course_idx: usize, slot: &TimetableSlot) {
        self.adjust(problem, course_idx, slot, 1);
    }

    pub(crate) fn unbook(&mut self, problem: &ProblemIndex, course_idx: usize, slot: &TimetableSlot) {
        self.adjust(problem, course_idx, slot, -1);
    }

    pub(crate) fn replace_slot(&mut self, slot_idx: usize, slot: TimetableSlot) {
        self.slots[slot_idx] = slot;
    }

    fn adjust(&mut self, problem: &ProblemIndex, course_idx: usize, slot: &TimetableSlot, sign: i64) {
        let rules = &problem.rules;
        let course = problem.course(course_idx);
        let range = PeriodRange::new(slot.start_period, slot.end_period);
        let span = range.span();
        let delta = sign * i64::from(span);

        for (kind, id) in [
            (EntityKind::Faculty, slot.faculty_id.as_str()),
            (EntityKind::Room, slot.room_id.as_str()),
            (EntityKind::Section, slot.section_id.as_str()),
        ] {
            if sign > 0 {
                self.ledger.reserve(kind, id, slot.day, range);
            } else {
                self.ledger.release(kind, id, slot.day, range);
            }
        }

        let days = rules.days_per_week;
        bump(&mut self.subject_day_load, course_idx, slot.day, days, delta);
        bump(&mut self.section_day_load, slot.section_id.clone(), slot.day, days, delta);
        match course.subject_kind {
            SubjectKind::Theory => {
                bump(&mut self.faculty_theory_day_load, slot.faculty_id.clone(), slot.day, days, delta);
            }
            SubjectKind::Lab => {
                let halves = self
                    .lab_halves
                    .entry((slot.faculty_id.clone(), slot.day))
                    .or_insert((0, 0));
                let counter = if rules.is_early_half(range) {
                    &mut halves.0
                } else {
                    &mut halves.1
                };
                *counter = (i64::from(*counter) + sign).max(0) as u32;
            }
        }

        let placed = self.placed.entry(course_idx).or_insert(0);
        *placed = (i64::from(*placed) + delta).max(0) as u32;
    }

    pub fn into_parts(self) -> (Vec<TimetableSlot>, Vec<String>) {
        (self.slots, self.diagnostics)
    }
}
