//! Engine facade: validation, lab phase, theory phase, refinement.

use crate::collaborator::LabSolver;
use crate::context::{ProblemIndex, SchedulingContext};
use crate::data::{ScheduleOutput, SchedulingInput, UnscheduledCourse};
use crate::error::EngineError;
use crate::lab_phase::run_lab_phase;
use crate::refine::{evaluate, refine};
use crate::rules::{EngineOptions, SchedulingRules};
use crate::theory_phase::run_theory_phase;
use crate::validate::{audit_schedule, validate_input};
use log::{info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

pub struct TimetableEngine {
    rules: SchedulingRules,
    options: EngineOptions,
    lab_solver: Option<Arc<dyn LabSolver>>,
    cancel: Arc<AtomicBool>,
}

impl TimetableEngine {
    pub fn new(rules: SchedulingRules, options: EngineOptions) -> Self {
        Self {
            rules,
            options,
            lab_solver: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_lab_solver(mut self, solver: Arc<dyn LabSolver>) -> Self {
        self.lab_solver = Some(solver);
        self
    }

    /// Flag checked between theory attempts and refinement generations.
    /// Once set it stays set; a cancelled engine returns its best result so far.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Builds a timetable for `input`.
    ///
    /// Fails only on malformed input. Courses that could not be fully
    /// placed are listed in `unscheduled`, with the reasons in `diagnostics`.
    pub fn solve(&self, input: &SchedulingInput) -> Result<ScheduleOutput, EngineError> {
        let started = Instant::now();
        validate_input(input, &self.rules).map_err(EngineError::InvalidInput)?;
        info!(
            "Scheduling {} course(s) into {} room(s)",
            input.courses.len(),
            input.rooms.len()
        );

        let problem = ProblemIndex::new(input, self.rules.clone());
        let mut checkpoint = SchedulingContext::new();
        for course in problem.courses.iter().filter(|c| problem.candidate_rooms(c).is_empty()) {
            checkpoint.diagnose(format!(
                "Course {} has no {} room with {} seats",
                course.key(),
                course.subject_kind,
                course.student_count
            ));
        }
        let lab_report = run_lab_phase(&problem, &mut checkpoint, self.lab_solver.as_deref());
        info!(
            "Lab phase done: {} lab(s), {} unplaced",
            lab_report.states.len(),
            lab_report.unplaced().count()
        );

        let theory = run_theory_phase(&problem, &checkpoint, &self.options, Some(self.cancel.as_ref()));
        let mut schedule = theory.best;
        if theory.cancelled {
            schedule.diagnose("Cancelled during the theory phase; returning the best attempt so far");
        }

        let fitness = if self.options.run_refinement && !self.cancel.load(Ordering::Relaxed) {
            let outcome = refine(
                &problem,
                schedule,
                &self.options.refinement,
                self.options.seed,
                Some(self.cancel.as_ref()),
            );
            schedule = outcome.best;
            schedule.diagnose(format!(
                "Refinement fitness {:.4} -> {:.4}",
                outcome.initial_fitness, outcome.best_fitness
            ));
            if outcome.cancelled {
                schedule.diagnose("Refinement cancelled; returning the best individual so far");
            }
            outcome.best_fitness
        } else {
            evaluate(&problem, &schedule).weighted(&self.options.refinement.weights)
        };

        for violation in audit_schedule(&problem, schedule.slots()) {
            warn!("Schedule audit: {}", violation);
            schedule.diagnose(format!("Audit: {}", violation));
        }

        let unscheduled: Vec<UnscheduledCourse> = problem
            .courses
            .iter()
            .enumerate()
            .filter(|(idx, course)| schedule.periods_placed(*idx) < course.periods_per_week)
            .map(|(idx, course)| UnscheduledCourse {
                course_id: course.key().to_string(),
                section_id: course.section_id.clone(),
                subject_id: course.subject_id.clone(),
                periods_placed: schedule.periods_placed(idx),
                periods_required: course.periods_per_week,
            })
            .collect();
        for course in &unscheduled {
            schedule.diagnose(course.to_string());
        }

        let (slots, diagnostics) = schedule.into_parts();
        info!(
            "Placed {} slot(s), {} course(s) short, in {:?}",
            slots.len(),
            unscheduled.len(),
            started.elapsed()
        );
        Ok(ScheduleOutput {
            slots,
            unscheduled,
            diagnostics,
            fitness: Some(fitness),
        })
    }
}
