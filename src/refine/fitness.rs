//! Weighted soft-constraint score. Every term lies in `[0, 1]`, higher is better.

use crate::context::{ProblemIndex, SchedulingContext};
use crate::data::{Day, Period, SubjectKind, TimetableSlot};
use crate::rules::FitnessWeights;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FitnessBreakdown {
    /// `1 - idle / spanned` over faculty days.
    pub faculty_gaps: f64,
    /// `1 - idle / spanned` over section days.
    pub section_gaps: f64,
    /// Mean over faculty of `1 / (1 + cv)` of their daily periods.
    pub workload_balance: f64,
    /// Share of theory periods before the lunch break.
    pub morning_bias: f64,
    /// Mean over lab blocks of `1 - day / (days - 1)`.
    pub lab_early_week: f64,
}

impl FitnessBreakdown {
    pub fn weighted(&self, weights: &FitnessWeights) -> f64 {
        let total = weights.total();
        if total <= 0.0 {
            return 0.0;
        }
        (weights.faculty_gaps * self.faculty_gaps
            + weights.section_gaps * self.section_gaps
            + weights.workload_balance * self.workload_balance
            + weights.morning_bias * self.morning_bias
            + weights.lab_early_week * self.lab_early_week)
            / total
    }
}

fn periods(slot: &TimetableSlot) -> impl Iterator<Item = Period> {
    slot.start_period..=slot.end_period
}

fn gap_score<'a>(slots: impl Iterator<Item = (&'a str, &'a TimetableSlot)>) -> f64 {
    let mut occupied: BTreeMap<(&str, Day), BTreeSet<Period>> = BTreeMap::new();
    for (owner, slot) in slots {
        occupied.entry((owner, slot.day)).or_default().extend(periods(slot));
    }

    let (idle, spanned) = occupied
        .values()
        .filter_map(|set| Some((*set.first()?, *set.last()?, set.len() as u32)))
        .fold((0u32, 0u32), |(idle, spanned), (first, last, held)| {
            let span = u32::from(last - first) + 1;
            (idle + span - held, spanned + span)
        });

    if spanned == 0 {
        1.0
    } else {
        1.0 - f64::from(idle) / f64::from(spanned)
    }
}

fn workload_balance(slots: &[TimetableSlot], days: u8) -> f64 {
    // ordered so the float sum below is the same on every evaluation
    let mut daily: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for slot in slots {
        let row = daily
            .entry(slot.faculty_id.as_str())
            .or_insert_with(|| vec![0.0; usize::from(days)]);
        if let Some(cell) = row.get_mut(usize::from(slot.day)) {
            *cell += f64::from(slot.span());
        }
    }
    if daily.is_empty() {
        return 1.0;
    }

    let scores: Vec<f64> = daily
        .values()
        .filter_map(|row| {
            let n = row.len() as f64;
            let mean = row.iter().sum::<f64>() / n;
            if mean <= 0.0 {
                return None;
            }
            let variance = row.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
            Some(1.0 / (1.0 + variance.sqrt() / mean))
        })
        .collect();
    if scores.is_empty() {
        1.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

pub fn evaluate(problem: &ProblemIndex, ctx: &SchedulingContext) -> FitnessBreakdown {
    let rules = &problem.rules;
    let slots = ctx.slots();
    let kind_of = |i: usize| problem.course(ctx.slot_courses()[i]).subject_kind;

    let mut theory_periods = 0u32;
    let mut morning_periods = 0u32;
    let mut lab_scores = Vec::new();
    for (i, slot) in slots.iter().enumerate() {
        match kind_of(i) {
            SubjectKind::Theory => {
                theory_periods += slot.span();
                morning_periods += periods(slot)
                    .filter(|&p| p <= rules.lunch_after_period)
                    .count() as u32;
            }
            SubjectKind::Lab => {
                let last_day = f64::from(rules.days_per_week.saturating_sub(1));
                lab_scores.push(if last_day > 0.0 {
                    1.0 - f64::from(slot.day) / last_day
                } else {
                    1.0
                });
            }
        }
    }

    FitnessBreakdown {
        faculty_gaps: gap_score(slots.iter().map(|s| (s.faculty_id.as_str(), s))),
        section_gaps: gap_score(slots.iter().map(|s| (s.section_id.as_str(), s))),
        workload_balance: workload_balance(slots, rules.days_per_week),
        morning_bias: if theory_periods == 0 {
            1.0
        } else {
            f64::from(morning_periods) / f64::from(theory_periods)
        },
        lab_early_week: if lab_scores.is_empty() {
            1.0
        } else {
            lab_scores.iter().sum::<f64>() / lab_scores.len() as f64
        },
    }
}
