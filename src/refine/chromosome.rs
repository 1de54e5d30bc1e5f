//! A candidate timetable for the refinement population.
//!
//! Genes are the slots of a [`SchedulingContext`]; gene `i` always belongs
//! to the same course in every individual, because individuals only ever
//! move slots, never add or drop them.

use super::fitness::{FitnessBreakdown, evaluate};
use crate::context::{ProblemIndex, SchedulingContext};
use crate::rules::FitnessWeights;

#[derive(Debug, Clone)]
pub struct Individual {
    pub schedule: SchedulingContext,
    pub fitness: f64,
    pub breakdown: Option<FitnessBreakdown>,
}

impl Individual {
    pub fn new(schedule: SchedulingContext) -> Self {
        Self {
            schedule,
            fitness: f64::NEG_INFINITY,
            breakdown: None,
        }
    }

    pub fn is_evaluated(&self) -> bool {
        self.breakdown.is_some()
    }

    pub fn evaluate(&mut self, problem: &ProblemIndex, weights: &FitnessWeights) {
        let breakdown = evaluate(problem, &self.schedule);
        self.fitness = breakdown.weighted(weights);
        self.breakdown = Some(breakdown);
    }

    pub fn genes(&self) -> usize {
        self.schedule.slots().len()
    }

    /// Individuals descend from the same schedule when their genes line up course for course.
    pub fn is_compatible(&self, other: &Individual) -> bool {
        self.schedule.slot_courses() == other.schedule.slot_courses()
    }
}
