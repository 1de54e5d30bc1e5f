//! Theory placement.
//!
//! Runs a fixed number of attempts, each on a fresh copy of the post-lab
//! checkpoint with its own course order. Later attempts drop the
//! day-balancing cap. The attempt placing the most periods wins, and the
//! first attempt to reach a score keeps it. A complete attempt ends the loop.
//!
//! Placement never backtracks: a block, once booked within an attempt,
//! stays. Completeness comes from retrying with other orders only.

use crate::context::{ProblemIndex, SchedulingContext};
use crate::data::{Day, SubjectKind};
use crate::ordering::{OrderingStrategy, order_courses};
use crate::rules::EngineOptions;
use crate::search::{SearchLimits, find_window, theory_windows};
use itertools::Itertools;
use log::{debug, info};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptScore {
    pub attempt: usize,
    pub strategy: OrderingStrategy,
    pub relaxed: bool,
    pub periods_placed: u32,
}

#[derive(Debug, Clone)]
pub struct TheoryPhaseResult {
    pub best: SchedulingContext,
    pub best_attempt: Option<usize>,
    pub scores: Vec<AttemptScore>,
    pub periods_required: u32,
    pub cancelled: bool,
}

impl TheoryPhaseResult {
    pub fn best_score(&self) -> u32 {
        self.best_attempt
            .and_then(|i| self.scores.get(i))
            .map_or(0, |s| s.periods_placed)
    }
}

fn attempt_seed(seed: u64, attempt: usize) -> u64 {
    seed.wrapping_add((attempt as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Days the section has seen least of come first; the partial day loses ties.
fn balanced_day_order(problem: &ProblemIndex, ctx: &SchedulingContext, course_idx: usize) -> Vec<Day> {
    let course = problem.course(course_idx);
    let rules = &problem.rules;
    rules
        .days()
        .sorted_by_key(|&day| {
            (
                ctx.subject_load(course_idx, day),
                ctx.section_load(&course.section_id, day),
                rules.is_partial_day(day),
                day,
            )
        })
        .collect()
}

/// Places one course's weekly quota in blocks of at most the daily block size.
fn place_course(
    problem: &ProblemIndex,
    ctx: &mut SchedulingContext,
    course_idx: usize,
    relaxed: bool,
    buffer: u32,
) {
    let rules = &problem.rules;
    let course = problem.course(course_idx);
    let rooms = problem.candidate_rooms(course);
    let limits = SearchLimits {
        faculty_day_cap: (!relaxed).then(|| problem.day_balance_cap(&course.faculty_id, buffer)),
        lab_fatigue: false,
    };
    let largest = u32::from(rules.max_theory_block).min(rules.max_subject_periods_per_day);

    while ctx.periods_placed(course_idx) < course.periods_per_week {
        let remaining = course.periods_per_week - ctx.periods_placed(course_idx);
        let day_order = balanced_day_order(problem, ctx, course_idx);
        let mut found = None;
        for span in (1..=largest.min(remaining)).rev() {
            let windows = theory_windows(rules, span as u8);
            found = find_window(problem, ctx, course_idx, &rooms, &day_order, &windows, limits);
            if found.is_some() {
                break;
            }
        }
        match found {
            Some(window) => {
                ctx.place(problem, course_idx, &window.room_id, window.day, window.range);
            }
            None => break,
        }
    }
}

/// One full pass over the theory courses on a copy of `checkpoint`.
pub fn run_attempt(
    problem: &ProblemIndex,
    checkpoint: &SchedulingContext,
    courses: &[usize],
    attempt: usize,
    options: &EngineOptions,
) -> (AttemptScore, SchedulingContext) {
    let strategy = OrderingStrategy::for_attempt(attempt);
    let relaxed = attempt >= options.relax_after_attempt;
    let mut rng = ChaCha8Rng::seed_from_u64(attempt_seed(options.seed, attempt));
    let order = order_courses(problem, courses, strategy, &mut rng);

    let mut ctx = checkpoint.clone();
    for course_idx in order {
        place_course(problem, &mut ctx, course_idx, relaxed, options.day_balance_buffer);
    }

    let periods_placed = courses.iter().map(|&i| ctx.periods_placed(i)).sum();
    let score = AttemptScore {
        attempt,
        strategy,
        relaxed,
        periods_placed,
    };
    (score, ctx)
}

pub fn run_theory_phase(
    problem: &ProblemIndex,
    checkpoint: &SchedulingContext,
    options: &EngineOptions,
    cancel: Option<&AtomicBool>,
) -> TheoryPhaseResult {
    let courses = problem.course_indices(SubjectKind::Theory);
    let periods_required = problem.total_required_periods(SubjectKind::Theory);
    let mut result = TheoryPhaseResult {
        best: checkpoint.clone(),
        best_attempt: None,
        scores: Vec::with_capacity(options.max_attempts),
        periods_required,
        cancelled: false,
    };
    if courses.is_empty() {
        return result;
    }

    for attempt in 0..options.max_attempts.max(1) {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            info!("Theory phase cancelled before attempt {}", attempt);
            result.cancelled = true;
            break;
        }

        let (score, ctx) = run_attempt(problem, checkpoint, &courses, attempt, options);
        debug!(
            "Attempt {} ({}, relaxed: {}) placed {}/{} periods",
            attempt, score.strategy, score.relaxed, score.periods_placed, periods_required
        );
        let improved = result.best_attempt.is_none() || score.periods_placed > result.best_score();
        result.scores.push(score);
        if improved {
            result.best = ctx;
            result.best_attempt = Some(attempt);
        }
        if score.periods_placed >= periods_required {
            info!("Attempt {} placed every theory period; stopping early", attempt);
            break;
        }
    }

    if let Some(best) = result.best_attempt {
        let score = result.scores[best];
        info!(
            "Best theory attempt {} of {} ({}) placed {}/{} periods",
            best,
            result.scores.len(),
            score.strategy,
            score.periods_placed,
            periods_required
        );
        result.best.diagnose(format!(
            "Theory attempt {} ({}{}) placed {}/{} periods after {} attempt(s)",
            best,
            score.strategy,
            if score.relaxed { ", day balancing relaxed" } else { "" },
            score.periods_placed,
            periods_required,
            result.scores.len()
        ));
    }
    result
}
