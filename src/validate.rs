//! Input validation and schedule auditing.
//!
//! `validate_input` rejects malformed requests before any scheduling work.
//! It reports every problem it finds rather than stopping at the first one.
//! `audit_schedule` checks a slot list against the hard invariants and is
//! the final guard applied to every engine result.

use crate::context::{ProblemIndex, room_fits};
use crate::data::{SchedulingInput, SubjectKind, TimetableSlot};
use crate::ledger::PeriodRange;
use crate::rules::SchedulingRules;
use itertools::Itertools;
use std::collections::{HashMap, HashSet};
use std::fmt;

pub type ValidationResult = Result<(), Vec<ValidationError>>;

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    /// Two courses share a (section, subject) pair.
    DuplicateCourse,
    DuplicateRoom,
    /// A course asks for zero periods per week.
    ZeroPeriods,
    /// No room of the subject's kind exists at all.
    NoRoomOfKind,
    /// A lab's weekly periods differ from the fixed block length.
    LabLengthMismatch,
    /// An availability window lies outside the weekly grid.
    WindowOutOfGrid,
    /// The rules themselves cannot describe a timetable.
    InvalidRules,
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

pub fn validate_input(input: &SchedulingInput, rules: &SchedulingRules) -> ValidationResult {
    let mut errors = Vec::new();

    if rules.days_per_week == 0 || rules.periods_per_day == 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidRules,
            "The weekly grid has no days or no periods",
        ));
    }
    if rules.lab_block_length == 0 || rules.lab_block_length > rules.periods_per_day {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidRules,
            format!(
                "Lab block length {} does not fit a day of {} periods",
                rules.lab_block_length, rules.periods_per_day
            ),
        ));
    }
    if rules.max_theory_block == 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidRules,
            "Theory blocks must allow at least one period",
        ));
    }

    let mut room_ids = HashSet::new();
    for room in &input.rooms {
        if !room_ids.insert(room.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateRoom,
                format!("Duplicate room ID: {}", room.id),
            ));
        }
    }
    let room_kinds: HashSet<SubjectKind> = input.rooms.iter().map(|r| r.kind).collect();

    let mut course_keys = HashSet::new();
    for course in &input.courses {
        let key = course.key();
        if !course_keys.insert(key.clone()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateCourse,
                format!("Duplicate course: {}", key),
            ));
        }
        if course.periods_per_week == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::ZeroPeriods,
                format!("Course {} has no periods per week", key),
            ));
        }
        if !room_kinds.contains(&course.subject_kind) {
            errors.push(ValidationError::new(
                ValidationErrorKind::NoRoomOfKind,
                format!("Course {} needs a {} room but none exists", key, course.subject_kind),
            ));
        }
        if course.is_lab() && course.periods_per_week != u32::from(rules.lab_block_length) {
            errors.push(ValidationError::new(
                ValidationErrorKind::LabLengthMismatch,
                format!(
                    "Lab {} asks for {} periods but lab blocks are {} periods long",
                    key, course.periods_per_week, rules.lab_block_length
                ),
            ));
        }
    }

    for window in &input.availability {
        if window.day >= rules.days_per_week
            || window.start_period == 0
            || window.start_period > window.end_period
            || window.end_period > rules.periods_per_day
        {
            errors.push(ValidationError::new(
                ValidationErrorKind::WindowOutOfGrid,
                format!(
                    "Availability window of {} (day {}, P{}-P{}) lies outside the weekly grid",
                    window.faculty_id, window.day, window.start_period, window.end_period
                ),
            ));
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// A broken hard invariant found in a slot list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    FacultyOverlap,
    RoomOverlap,
    SectionOverlap,
    LabBlock,
    OverQuota,
    RoomMismatch,
    Availability,
    Boundary,
    UnknownReference,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

fn range_of(slot: &TimetableSlot) -> PeriodRange {
    PeriodRange::new(slot.start_period, slot.end_period)
}

fn overlaps<'a, F>(slots: &'a [TimetableSlot], kind: ViolationKind, label: &str, key: F) -> Vec<Violation>
where
    F: Fn(&'a TimetableSlot) -> &'a str,
{
    let mut out = Vec::new();
    let grouped = slots.iter().map(|s| ((key(s), s.day), s)).into_group_map();
    for ((id, day), group) in grouped.into_iter().sorted_by(|a, b| a.0.cmp(&b.0)) {
        for (a, b) in group.iter().tuple_combinations() {
            if range_of(a).overlaps(&range_of(b)) {
                out.push(Violation {
                    kind,
                    message: format!(
                        "{} {} double-booked on day {}: {} {} and {} {}",
                        label,
                        id,
                        day,
                        a.course_key(),
                        range_of(a),
                        b.course_key(),
                        range_of(b)
                    ),
                });
            }
        }
    }
    out
}

/// Every hard invariant violation in `slots`. Empty means the list is valid.
pub fn audit_schedule(problem: &ProblemIndex, slots: &[TimetableSlot]) -> Vec<Violation> {
    let rules = &problem.rules;
    let mut violations = Vec::new();

    violations.extend(overlaps(slots, ViolationKind::FacultyOverlap, "faculty", |s| {
        s.faculty_id.as_str()
    }));
    violations.extend(overlaps(slots, ViolationKind::RoomOverlap, "room", |s| s.room_id.as_str()));
    violations.extend(overlaps(slots, ViolationKind::SectionOverlap, "section", |s| {
        s.section_id.as_str()
    }));

    let mut placed: HashMap<usize, (u32, u32)> = HashMap::new();
    for slot in slots {
        let key = slot.course_key();
        let Some(course_idx) = problem.course_index(&key) else {
            violations.push(Violation {
                kind: ViolationKind::UnknownReference,
                message: format!("Slot references unknown course {}", key),
            });
            continue;
        };
        let course = problem.course(course_idx);
        let range = range_of(slot);

        let entry = placed.entry(course_idx).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += range.span();

        if course.is_lab() && range.span() != u32::from(rules.lab_block_length) {
            violations.push(Violation {
                kind: ViolationKind::LabBlock,
                message: format!(
                    "Lab {} spans {} periods instead of {}",
                    key,
                    range.span(),
                    rules.lab_block_length
                ),
            });
        }

        match problem.room(&slot.room_id) {
            None => violations.push(Violation {
                kind: ViolationKind::UnknownReference,
                message: format!("Slot of {} references unknown room {}", key, slot.room_id),
            }),
            Some(room) if !room_fits(room, course) => violations.push(Violation {
                kind: ViolationKind::RoomMismatch,
                message: format!(
                    "Room {} ({} seats, {}) cannot host {} ({} students, {})",
                    room.id, room.capacity, room.kind, key, course.student_count, course.subject_kind
                ),
            }),
            Some(_) => {}
        }

        if !problem.is_available(&slot.faculty_id, slot.day, range) {
            violations.push(Violation {
                kind: ViolationKind::Availability,
                message: format!(
                    "Faculty {} is not available on day {} {} for {}",
                    slot.faculty_id, slot.day, range, key
                ),
            });
        }

        if slot.day >= rules.days_per_week
            || range.start == 0
            || range.end > rules.last_period(slot.day, course.year_level)
            || rules.crosses_lunch(range)
        {
            violations.push(Violation {
                kind: ViolationKind::Boundary,
                message: format!("Slot of {} on day {} {} breaks a day boundary", key, slot.day, range),
            });
        }
    }

    for (course_idx, (count, periods)) in placed.into_iter().sorted() {
        let course = problem.course(course_idx);
        let too_many = if course.is_lab() {
            count > 1
        } else {
            periods > course.periods_per_week
        };
        if too_many {
            violations.push(Violation {
                kind: if course.is_lab() {
                    ViolationKind::LabBlock
                } else {
                    ViolationKind::OverQuota
                },
                message: format!(
                    "Course {} holds {} block(s) / {} periods for a quota of {}",
                    course.key(),
                    count,
                    periods,
                    course.periods_per_week
                ),
            });
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ClassroomOption, CourseAssignment, FacultyAvailabilityWindow};

    fn input() -> SchedulingInput {
        SchedulingInput {
            courses: vec![
                CourseAssignment {
                    section_id: "S1".into(),
                    subject_id: "MATH".into(),
                    subject_kind: SubjectKind::Theory,
                    periods_per_week: 4,
                    faculty_id: "F1".into(),
                    student_count: 30,
                    year_level: 2,
                },
                CourseAssignment {
                    section_id: "S2".into(),
                    subject_id: "MATH".into(),
                    subject_kind: SubjectKind::Theory,
                    periods_per_week: 4,
                    faculty_id: "F1".into(),
                    student_count: 30,
                    year_level: 2,
                },
            ],
            rooms: vec![ClassroomOption {
                id: "R1".into(),
                capacity: 40,
                kind: SubjectKind::Theory,
            }],
            availability: vec![],
        }
    }

    fn slot(section: &str, room: &str, day: u8, start: u8, end: u8) -> TimetableSlot {
        TimetableSlot {
            section_id: section.into(),
            subject_id: "MATH".into(),
            faculty_id: "F1".into(),
            room_id: room.into(),
            day,
            start_period: start,
            end_period: end,
        }
    }

    #[test]
    fn test_valid_input_passes() {
        assert!(validate_input(&input(), &SchedulingRules::default()).is_ok());
    }

    #[test]
    fn test_collects_all_problems() {
        let mut bad = input();
        bad.courses.push(bad.courses[0].clone());
        bad.courses.push(CourseAssignment {
            subject_id: "CHEML".into(),
            subject_kind: SubjectKind::Lab,
            periods_per_week: 3,
            ..bad.courses[0].clone()
        });
        bad.rooms.push(bad.rooms[0].clone());
        bad.availability.push(FacultyAvailabilityWindow {
            faculty_id: "F1".into(),
            day: 9,
            start_period: 1,
            end_period: 2,
        });
        let errors = validate_input(&bad, &SchedulingRules::default()).unwrap_err();
        let kinds: HashSet<ValidationErrorKind> = errors.iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&ValidationErrorKind::DuplicateCourse));
        assert!(kinds.contains(&ValidationErrorKind::DuplicateRoom));
        assert!(kinds.contains(&ValidationErrorKind::NoRoomOfKind));
        assert!(kinds.contains(&ValidationErrorKind::LabLengthMismatch));
        assert!(kinds.contains(&ValidationErrorKind::WindowOutOfGrid));
    }

    #[test]
    fn test_audit_detects_overlaps() {
        let problem = ProblemIndex::new(&input(), SchedulingRules::default());
        let clean = vec![slot("S1", "R1", 0, 1, 2), slot("S2", "R1", 0, 3, 4)];
        assert!(audit_schedule(&problem, &clean).is_empty());

        let clash = vec![slot("S1", "R1", 0, 1, 2), slot("S2", "R1", 0, 2, 3)];
        let kinds: Vec<ViolationKind> = audit_schedule(&problem, &clash).iter().map(|v| v.kind).collect();
        assert!(kinds.contains(&ViolationKind::FacultyOverlap));
        assert!(kinds.contains(&ViolationKind::RoomOverlap));
        assert!(!kinds.contains(&ViolationKind::SectionOverlap));
    }

    #[test]
    fn test_audit_detects_boundary_and_quota() {
        let problem = ProblemIndex::new(&input(), SchedulingRules::default());
        let lunch = vec![slot("S1", "R1", 0, 4, 5)];
        assert_eq!(audit_schedule(&problem, &lunch)[0].kind, ViolationKind::Boundary);

        let too_much = vec![
            slot("S1", "R1", 0, 1, 2),
            slot("S1", "R1", 1, 1, 2),
            slot("S1", "R1", 2, 1, 2),
        ];
        assert_eq!(audit_schedule(&problem, &too_much)[0].kind, ViolationKind::OverQuota);
    }
}
