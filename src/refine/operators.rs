//! Hard-constraint-preserving genetic operators.
//!
//! Every change to a schedule goes through [`try_move`], which releases the
//! slot, checks the replacement against the rest of the timetable and either
//! books it or restores the original. A rejected move leaves the schedule
//! exactly as it was.

use super::chromosome::Individual;
use crate::context::{ProblemIndex, SchedulingContext};
use crate::data::{SubjectKind, TimetableSlot};
use crate::search::{SearchLimits, lab_windows, slot_admits, theory_windows};
use rand::Rng;
use rand::seq::IndexedRandom;

/// Hard rules plus the lab fatigue rule. Day balancing is a placement heuristic only.
const MOVE_LIMITS: SearchLimits = SearchLimits {
    faculty_day_cap: None,
    lab_fatigue: true,
};

/// Replaces slot `slot_idx` with `candidate` if the timetable stays valid.
pub fn try_move(
    problem: &ProblemIndex,
    schedule: &mut SchedulingContext,
    slot_idx: usize,
    candidate: TimetableSlot,
) -> bool {
    let Some(current) = schedule.slots().get(slot_idx).cloned() else {
        return false;
    };
    if current == candidate
        || current.course_key() != candidate.course_key()
        || current.faculty_id != candidate.faculty_id
        || current.span() != candidate.span()
    {
        return false;
    }

    let course_idx = schedule.slot_courses()[slot_idx];
    schedule.unbook(problem, course_idx, &current);
    if slot_admits(problem, schedule, course_idx, &candidate, MOVE_LIMITS) {
        schedule.book(problem, course_idx, &candidate);
        schedule.replace_slot(slot_idx, candidate);
        true
    } else {
        schedule.book(problem, course_idx, &current);
        false
    }
}

/// Mutation: moves one random slot to a random day, window and room.
pub fn relocate<R: Rng>(problem: &ProblemIndex, schedule: &mut SchedulingContext, rng: &mut R) -> bool {
    let rules = &problem.rules;
    if schedule.slots().is_empty() || rules.days_per_week == 0 {
        return false;
    }
    let slot_idx = rng.random_range(0..schedule.slots().len());
    let course = problem.course(schedule.slot_courses()[slot_idx]);
    let current = &schedule.slots()[slot_idx];

    let windows = match course.subject_kind {
        SubjectKind::Lab => lab_windows(rules),
        SubjectKind::Theory => theory_windows(rules, u8::try_from(current.span()).unwrap_or(0)),
    };
    let day = rng.random_range(0..rules.days_per_week);
    let Some(range) = windows.choose(rng).copied() else {
        return false;
    };
    let rooms = problem.candidate_rooms(course);
    let Some(room) = rooms.choose(rng) else {
        return false;
    };

    let candidate = TimetableSlot {
        room_id: room.id.clone(),
        day,
        start_period: range.start,
        end_period: range.end,
        ..current.clone()
    };
    try_move(problem, schedule, slot_idx, candidate)
}

/// Single-point crossover: genes after a random cut are taken from `second`
/// one at a time, each only if it fits the child built so far.
pub fn crossover<R: Rng>(
    problem: &ProblemIndex,
    first: &Individual,
    second: &Individual,
    rng: &mut R,
) -> Individual {
    let mut child = Individual::new(first.schedule.clone());
    let genes = child.genes();
    if genes < 2 || !first.is_compatible(second) {
        return child;
    }

    let cut = rng.random_range(1..genes);
    for slot_idx in cut..genes {
        let gene = second.schedule.slots()[slot_idx].clone();
        try_move(problem, &mut child.schedule, slot_idx, gene);
    }
    child
}

/// Best of `size` individuals drawn at random, with replacement.
pub fn tournament<'a, R: Rng>(population: &'a [Individual], size: usize, rng: &mut R) -> Option<&'a Individual> {
    (0..size.max(1))
        .filter_map(|_| population.choose(rng))
        .reduce(|best, next| if next.fitness > best.fitness { next } else { best })
}
