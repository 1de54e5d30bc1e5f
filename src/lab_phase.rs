//! Lab placement.
//!
//! Each lab course moves `Pending -> Delegated -> {Placed | Fallback}`. The
//! whole batch is first offered to the lab solver; a well-formed success is
//! booked as returned. Any other outcome sends every lab through greedy slot
//! search on weekdays first, then the partial day, with the fatigue rule on.

use crate::collaborator::{LabRules, LabSolveRequest, LabSolveResponse, LabSolver};
use crate::context::{ProblemIndex, SchedulingContext};
use crate::data::{CourseKey, SubjectKind};
use crate::error::CollaboratorError;
use crate::ledger::PeriodRange;
use crate::search::{SearchLimits, find_window, lab_windows};
use log::{info, warn};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabState {
    Pending,
    Delegated,
    /// Booked from the solver's answer.
    Placed,
    /// Handled by slot search; `placed` tells whether a window was found.
    Fallback { placed: bool },
}

#[derive(Debug, Clone, Default)]
pub struct LabPhaseReport {
    /// Lab course index and its final state, in input order.
    pub states: Vec<(usize, LabState)>,
    pub collaborator_error: Option<CollaboratorError>,
    pub solve_time_ms: Option<u64>,
}

impl LabPhaseReport {
    pub fn unplaced(&self) -> impl Iterator<Item = usize> + '_ {
        self.states
            .iter()
            .filter(|(_, state)| matches!(state, LabState::Fallback { placed: false }))
            .map(|(idx, _)| *idx)
    }
}

pub fn build_request(problem: &ProblemIndex, labs: &[usize]) -> LabSolveRequest {
    LabSolveRequest {
        courses: labs.iter().map(|&i| problem.course(i).clone()).collect(),
        rooms: problem
            .rooms
            .iter()
            .filter(|r| r.kind == SubjectKind::Lab)
            .cloned()
            .collect(),
        faculty_availability: problem.availability_windows().to_vec(),
        rules: LabRules::from_rules(&problem.rules),
    }
}

/// Maps a solver answer onto lab course indices, or explains why it cannot be used.
fn accept_response(
    problem: &ProblemIndex,
    labs: &[usize],
    response: LabSolveResponse,
) -> Result<Vec<(usize, String, u8, PeriodRange)>, CollaboratorError> {
    if !response.success {
        let reason = format!("{} {}", response.status, response.message);
        return Err(if response.status == "INFEASIBLE" {
            CollaboratorError::Infeasible(reason)
        } else {
            CollaboratorError::SolverError(reason)
        });
    }

    let rules = &problem.rules;
    let expected: HashMap<CourseKey, usize> = labs.iter().map(|&i| (problem.course(i).key(), i)).collect();
    let mut accepted = Vec::with_capacity(labs.len());
    let mut seen = HashSet::new();

    for a in response.assignments {
        let key = CourseKey {
            section_id: a.section_id,
            subject_id: a.subject_id,
        };
        let Some(&course_idx) = expected.get(&key) else {
            return Err(CollaboratorError::Malformed(format!("unexpected course {}", key)));
        };
        if !seen.insert(course_idx) {
            return Err(CollaboratorError::Malformed(format!("course {} assigned twice", key)));
        }
        if a.start_period == 0
            || a.end_period < a.start_period
            || a.end_period > rules.periods_per_day
            || a.day >= rules.days_per_week
        {
            return Err(CollaboratorError::Malformed(format!(
                "course {} placed outside the grid",
                key
            )));
        }
        let range = PeriodRange::new(a.start_period, a.end_period);
        if range.span() != u32::from(rules.lab_block_length) {
            return Err(CollaboratorError::Malformed(format!(
                "course {} spans {} periods",
                key,
                range.span()
            )));
        }
        if !problem.room(&a.room_id).is_some_and(|r| r.kind == SubjectKind::Lab) {
            return Err(CollaboratorError::Malformed(format!(
                "course {} placed in unknown lab room {}",
                key, a.room_id
            )));
        }
        accepted.push((course_idx, a.room_id, a.day, range));
    }

    if accepted.len() != labs.len() {
        return Err(CollaboratorError::Malformed(format!(
            "{} of {} labs assigned",
            accepted.len(),
            labs.len()
        )));
    }
    Ok(accepted)
}

pub fn run_lab_phase(
    problem: &ProblemIndex,
    ctx: &mut SchedulingContext,
    solver: Option<&dyn LabSolver>,
) -> LabPhaseReport {
    let labs = problem.course_indices(SubjectKind::Lab);
    let mut report = LabPhaseReport {
        states: labs.iter().map(|&i| (i, LabState::Pending)).collect(),
        ..LabPhaseReport::default()
    };
    if labs.is_empty() {
        return report;
    }

    let outcome = match solver {
        None => Err(CollaboratorError::NotConfigured),
        Some(solver) => {
            for (_, state) in report.states.iter_mut() {
                *state = LabState::Delegated;
            }
            let request = build_request(problem, &labs);
            info!("Delegating {} lab(s) to the {} lab solver", labs.len(), solver.name());
            solver.solve(&request).and_then(|response| {
                report.solve_time_ms = Some(response.solve_time_ms);
                accept_response(problem, &labs, response)
            })
        }
    };

    match outcome {
        Ok(accepted) => {
            for (course_idx, room_id, day, range) in accepted {
                ctx.place(problem, course_idx, &room_id, day, range);
            }
            for (_, state) in report.states.iter_mut() {
                *state = LabState::Placed;
            }
            ctx.diagnose(format!("Lab solver placed all {} lab(s)", labs.len()));
        }
        Err(err) => {
            warn!("Falling back to greedy lab placement: {}", err);
            ctx.diagnose(format!("{}; placing labs by slot search", err));
            report.collaborator_error = Some(err);
            place_labs_greedily(problem, ctx, &mut report);
        }
    }

    report
}

fn place_labs_greedily(problem: &ProblemIndex, ctx: &mut SchedulingContext, report: &mut LabPhaseReport) {
    let day_order = problem.rules.weekday_first_order();
    let windows = lab_windows(&problem.rules);
    let limits = SearchLimits {
        faculty_day_cap: None,
        lab_fatigue: true,
    };

    for (course_idx, state) in report.states.iter_mut() {
        let course = problem.course(*course_idx);
        let rooms = problem.candidate_rooms(course);
        let found = find_window(problem, ctx, *course_idx, &rooms, &day_order, &windows, limits);
        *state = match found {
            Some(window) => {
                ctx.place(problem, *course_idx, &window.room_id, window.day, window.range);
                LabState::Fallback { placed: true }
            }
            None => {
                ctx.diagnose(format!(
                    "Lab {} found no free {}-period block ({} suitable room(s))",
                    course.key(),
                    problem.rules.lab_block_length,
                    rooms.len()
                ));
                LabState::Fallback { placed: false }
            }
        };
    }
}
