//! Weekly grid rules and engine tuning options.
//!
//! Every field carries a default so a partial JSON document (or none at all)
//! yields a usable configuration.

use crate::data::{Day, Period};
use crate::ledger::PeriodRange;
use serde::{Deserialize, Serialize};

/// Shape of the teaching week and the hard rules tied to it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulingRules {
    /// Days in the weekly cycle, numbered from 0.
    pub days_per_week: u8,
    /// Periods in a day, numbered from 1.
    pub periods_per_day: u8,
    /// Last period before the protected lunch boundary.
    pub lunch_after_period: Period,
    pub allow_lunch_crossing: bool,
    /// Fixed contiguous length of every lab block.
    pub lab_block_length: u8,
    /// Largest block a theory course may occupy in one sitting.
    pub max_theory_block: u8,
    /// Cap on periods of one (section, subject) per day.
    pub max_subject_periods_per_day: u32,
    /// Cap on periods of one section per day, labs included.
    pub max_section_periods_per_day: u32,
    /// The partially available weekend day, if any.
    pub partial_day: Option<Day>,
    pub partial_day_last_period: Period,
    /// Year levels allowed to use the whole partial day.
    pub partial_day_full_access_years: Vec<u32>,
}

impl Default for SchedulingRules {
    fn default() -> Self {
        Self {
            days_per_week: 6,
            periods_per_day: 8,
            lunch_after_period: 4,
            allow_lunch_crossing: false,
            lab_block_length: 4,
            max_theory_block: 2,
            max_subject_periods_per_day: 2,
            max_section_periods_per_day: 8,
            partial_day: Some(5),
            partial_day_last_period: 4,
            partial_day_full_access_years: vec![1],
        }
    }
}

impl SchedulingRules {
    pub fn days(&self) -> std::ops::Range<Day> {
        0..self.days_per_week
    }

    pub fn is_partial_day(&self, day: Day) -> bool {
        self.partial_day == Some(day)
    }

    /// Last period a course of `year_level` may occupy on `day`.
    pub fn last_period(&self, day: Day, year_level: u32) -> Period {
        if self.is_partial_day(day) && !self.partial_day_full_access_years.contains(&year_level) {
            self.partial_day_last_period.min(self.periods_per_day)
        } else {
            self.periods_per_day
        }
    }

    pub fn crosses_lunch(&self, range: PeriodRange) -> bool {
        !self.allow_lunch_crossing
            && range.start <= self.lunch_after_period
            && range.end > self.lunch_after_period
    }

    /// Weekdays ascending with the partial day last.
    pub fn weekday_first_order(&self) -> Vec<Day> {
        let mut days: Vec<Day> = self.days().filter(|d| !self.is_partial_day(*d)).collect();
        if let Some(partial) = self.partial_day.filter(|d| *d < self.days_per_week) {
            days.push(partial);
        }
        days
    }

    /// Whether `range` starts in the early half of the day (before lunch).
    pub fn is_early_half(&self, range: PeriodRange) -> bool {
        range.start <= self.lunch_after_period
    }
}

/// Weights of the refinement fitness terms. They should sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FitnessWeights {
    pub faculty_gaps: f64,
    pub section_gaps: f64,
    pub workload_balance: f64,
    pub morning_bias: f64,
    pub lab_early_week: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            faculty_gaps: 0.30,
            section_gaps: 0.25,
            workload_balance: 0.20,
            morning_bias: 0.15,
            lab_early_week: 0.10,
        }
    }
}

impl FitnessWeights {
    pub fn total(&self) -> f64 {
        self.faculty_gaps
            + self.section_gaps
            + self.workload_balance
            + self.morning_bias
            + self.lab_early_week
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefinementOptions {
    pub population_size: usize,
    pub generations: usize,
    /// Share of the population carried over unchanged.
    pub elite_ratio: f64,
    pub tournament_size: usize,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    /// Relocation tries used to derive each seeded variant.
    pub seed_relocations: usize,
    pub weights: FitnessWeights,
}

impl Default for RefinementOptions {
    fn default() -> Self {
        Self {
            population_size: 20,
            generations: 40,
            elite_ratio: 0.1,
            tournament_size: 3,
            crossover_rate: 0.8,
            mutation_rate: 0.3,
            seed_relocations: 8,
            weights: FitnessWeights::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineOptions {
    pub run_refinement: bool,
    pub max_attempts: usize,
    /// Attempts with an index at or beyond this drop the day-balancing cap.
    pub relax_after_attempt: usize,
    /// Added to `ceil(weekly theory load / days)` to form the day-balancing cap.
    pub day_balance_buffer: u32,
    pub seed: u64,
    pub refinement: RefinementOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            run_refinement: true,
            max_attempts: 15,
            relax_after_attempt: 10,
            day_balance_buffer: 1,
            seed: 42,
            refinement: RefinementOptions::default(),
        }
    }
}
