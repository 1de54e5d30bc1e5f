//! Greedy slot search.
//!
//! Walks days in the caller's order, then windows in the caller's priority
//! order, and returns the first (day, range, room) that passes every hard
//! check against the current context. There is no lookahead: a course can
//! miss out even when a different placement of earlier courses would have
//! left room for it.

use crate::context::{ProblemIndex, SchedulingContext, room_fits};
use crate::data::{ClassroomOption, Day, RoomId, SubjectKind, TimetableSlot};
use crate::ledger::{EntityKind, PeriodRange};
use crate::rules::SchedulingRules;
use log::trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub day: Day,
    pub range: PeriodRange,
    pub room_id: RoomId,
}

/// Soft rules layered on top of the hard constraints for one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchLimits {
    /// Day-balancing cap on one faculty member's theory periods per day.
    pub faculty_day_cap: Option<u32>,
    /// Forbid a lab block in the half-day adjacent to one the faculty already holds.
    pub lab_fatigue: bool,
}

/// Lab block positions of the fixed block length, earliest first.
pub fn lab_windows(rules: &SchedulingRules) -> Vec<PeriodRange> {
    windows_of_span(rules, rules.lab_block_length)
}

/// Theory block positions of `span` periods, morning first.
pub fn theory_windows(rules: &SchedulingRules, span: u8) -> Vec<PeriodRange> {
    windows_of_span(rules, span)
}

fn windows_of_span(rules: &SchedulingRules, span: u8) -> Vec<PeriodRange> {
    if span == 0 || span > rules.periods_per_day {
        return Vec::new();
    }
    (1..=rules.periods_per_day - span + 1)
        .map(|start| PeriodRange::with_span(start, span))
        .filter(|range| !rules.crosses_lunch(*range))
        .collect()
}

/// Time-level checks: grid bounds, lunch, faculty, section and daily caps.
pub fn time_admits(
    problem: &ProblemIndex,
    ctx: &SchedulingContext,
    course_idx: usize,
    day: Day,
    range: PeriodRange,
    limits: SearchLimits,
) -> bool {
    let rules = &problem.rules;
    let course = problem.course(course_idx);
    let span = range.span();

    if day >= rules.days_per_week
        || range.start == 0
        || range.end > rules.last_period(day, course.year_level)
        || rules.crosses_lunch(range)
    {
        return false;
    }

    if !ctx.ledger.is_free(EntityKind::Faculty, &course.faculty_id, day, range)
        || !problem.is_available(&course.faculty_id, day, range)
    {
        return false;
    }

    if !ctx.ledger.is_free(EntityKind::Section, &course.section_id, day, range) {
        return false;
    }

    if ctx.section_load(&course.section_id, day) + span > rules.max_section_periods_per_day {
        return false;
    }

    match course.subject_kind {
        SubjectKind::Theory => {
            if ctx.subject_load(course_idx, day) + span > rules.max_subject_periods_per_day {
                return false;
            }
            if let Some(cap) = limits.faculty_day_cap {
                if ctx.faculty_theory_load(&course.faculty_id, day) + span > cap {
                    return false;
                }
            }
        }
        SubjectKind::Lab => {
            if limits.lab_fatigue {
                let (early, late) = ctx.lab_halves(&course.faculty_id, day);
                let conflicting = if rules.is_early_half(range) { late } else { early };
                if conflicting > 0 {
                    return false;
                }
            }
        }
    }

    true
}

pub fn room_admits(
    problem: &ProblemIndex,
    ctx: &SchedulingContext,
    course_idx: usize,
    room: &ClassroomOption,
    day: Day,
    range: PeriodRange,
) -> bool {
    room_fits(room, problem.course(course_idx))
        && ctx.ledger.is_free(EntityKind::Room, &room.id, day, range)
}

/// Full check of a concrete slot for `course_idx`.
pub fn slot_admits(
    problem: &ProblemIndex,
    ctx: &SchedulingContext,
    course_idx: usize,
    slot: &TimetableSlot,
    limits: SearchLimits,
) -> bool {
    let range = PeriodRange::new(slot.start_period, slot.end_period);
    time_admits(problem, ctx, course_idx, slot.day, range, limits)
        && problem
            .room(&slot.room_id)
            .is_some_and(|room| room_admits(problem, ctx, course_idx, room, slot.day, range))
}

/// First window satisfying every hard constraint, or `None`.
pub fn find_window(
    problem: &ProblemIndex,
    ctx: &SchedulingContext,
    course_idx: usize,
    rooms: &[&ClassroomOption],
    day_order: &[Day],
    windows: &[PeriodRange],
    limits: SearchLimits,
) -> Option<Window> {
    for &day in day_order {
        for &range in windows {
            if !time_admits(problem, ctx, course_idx, day, range, limits) {
                continue;
            }
            if let Some(room) = rooms
                .iter()
                .find(|room| room_admits(problem, ctx, course_idx, room, day, range))
            {
                trace!(
                    "course {} fits day {} {} in room {}",
                    problem.course(course_idx).key(),
                    day,
                    range,
                    room.id
                );
                return Some(Window {
                    day,
                    range,
                    room_id: room.id.clone(),
                });
            }
        }
    }
    None
}
