//! Course ordering strategies for theory attempts.
//!
//! The greedy search is sensitive to the order courses are served in, so
//! successive attempts try different orders. Ties always fall back to input
//! order, which keeps every strategy reproducible.

use crate::context::ProblemIndex;
use crate::search::theory_windows;
use itertools::Itertools;
use rand::Rng;
use rand::seq::SliceRandom;
use std::cmp::Reverse;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderingStrategy {
    /// Sections in turn; inside a section, busiest faculty first.
    SectionThenFacultyLoad,
    /// Fewest legal (day, window, room) combinations first.
    MostConstrainedFirst,
    /// One course per faculty member in round robin.
    FacultyInterleaved,
    /// Most weekly periods first.
    WorkloadDescending,
    /// Seeded random permutation.
    Shuffle,
}

impl OrderingStrategy {
    pub const DETERMINISTIC: [OrderingStrategy; 4] = [
        OrderingStrategy::SectionThenFacultyLoad,
        OrderingStrategy::MostConstrainedFirst,
        OrderingStrategy::FacultyInterleaved,
        OrderingStrategy::WorkloadDescending,
    ];

    /// The fixed strategies come first, random shuffles fill the remaining attempts.
    pub fn for_attempt(attempt: usize) -> Self {
        Self::DETERMINISTIC
            .get(attempt)
            .copied()
            .unwrap_or(OrderingStrategy::Shuffle)
    }
}

impl fmt::Display for OrderingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderingStrategy::SectionThenFacultyLoad => "section-then-faculty-load",
            OrderingStrategy::MostConstrainedFirst => "most-constrained-first",
            OrderingStrategy::FacultyInterleaved => "faculty-interleaved",
            OrderingStrategy::WorkloadDescending => "workload-descending",
            OrderingStrategy::Shuffle => "shuffle",
        };
        write!(f, "{}", name)
    }
}

/// Rough count of placements open to a course on an empty timetable.
pub fn legal_window_estimate(problem: &ProblemIndex, course_idx: usize) -> usize {
    let rules = &problem.rules;
    let course = problem.course(course_idx);
    let span = rules
        .max_theory_block
        .min(u8::try_from(course.periods_per_week).unwrap_or(u8::MAX))
        .max(1);
    let rooms = problem.candidate_rooms(course).len();
    let windows = theory_windows(rules, span);
    let open: usize = rules
        .days()
        .map(|day| {
            windows
                .iter()
                .filter(|w| w.end <= rules.last_period(day, course.year_level))
                .filter(|w| problem.is_available(&course.faculty_id, day, **w))
                .count()
        })
        .sum();
    open * rooms
}

pub fn order_courses<R: Rng>(
    problem: &ProblemIndex,
    courses: &[usize],
    strategy: OrderingStrategy,
    rng: &mut R,
) -> Vec<usize> {
    let faculty_load = |idx: usize| problem.faculty_theory_load(&problem.course(idx).faculty_id);

    match strategy {
        OrderingStrategy::SectionThenFacultyLoad => courses
            .iter()
            .copied()
            .sorted_by_key(|&i| {
                (
                    problem.course(i).section_id.clone(),
                    Reverse(faculty_load(i)),
                    problem.course(i).faculty_id.clone(),
                    i,
                )
            })
            .collect(),
        OrderingStrategy::MostConstrainedFirst => courses
            .iter()
            .copied()
            .sorted_by_key(|&i| {
                (
                    legal_window_estimate(problem, i),
                    Reverse(problem.course(i).periods_per_week),
                    i,
                )
            })
            .collect(),
        OrderingStrategy::FacultyInterleaved => {
            let queues: Vec<Vec<usize>> = courses
                .iter()
                .copied()
                .into_group_map_by(|&i| problem.course(i).faculty_id.clone())
                .into_iter()
                .sorted_by_key(|(faculty, queue)| {
                    (Reverse(faculty_load(queue[0])), faculty.clone())
                })
                .map(|(_, mut queue)| {
                    queue.sort_unstable();
                    queue
                })
                .collect();
            let longest = queues.iter().map(Vec::len).max().unwrap_or(0);
            (0..longest)
                .flat_map(|round| queues.iter().filter_map(move |q| q.get(round).copied()))
                .collect()
        }
        OrderingStrategy::WorkloadDescending => courses
            .iter()
            .copied()
            .sorted_by_key(|&i| (Reverse(problem.course(i).periods_per_week), Reverse(faculty_load(i)), i))
            .collect(),
        OrderingStrategy::Shuffle => {
            let mut order = courses.to_vec();
            order.shuffle(rng);
            order
        }
    }
}
