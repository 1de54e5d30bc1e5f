mod common;

use common::*;
use itertools::Itertools;
use std::sync::Arc;
use timetable_engine::context::{ProblemIndex, SchedulingContext};
use timetable_engine::lab_phase::run_lab_phase;
use timetable_engine::refine::refine;
use timetable_engine::solver::IlpLabSolver;
use timetable_engine::theory_phase::run_theory_phase;
use timetable_engine::validate::audit_schedule;
use timetable_engine::{
    EngineOptions, ScheduleOutput, SchedulingInput, SchedulingRules, SubjectKind, TimetableEngine,
    TimetableSlot,
};

fn solve(input: &SchedulingInput, with_ilp: bool) -> ScheduleOutput {
    let mut engine = TimetableEngine::new(SchedulingRules::default(), quick_options());
    if with_ilp {
        engine = engine.with_lab_solver(Arc::new(IlpLabSolver::default()));
    }
    engine.solve(input).unwrap()
}

fn overlapping(a: &TimetableSlot, b: &TimetableSlot) -> bool {
    a.day == b.day && a.start_period <= b.end_period && b.start_period <= a.end_period
}

fn assert_no_overlap(slots: &[TimetableSlot]) {
    for (a, b) in slots.iter().tuple_combinations() {
        if overlapping(a, b) {
            assert_ne!(a.faculty_id, b.faculty_id, "faculty clash: {:?} / {:?}", a, b);
            assert_ne!(a.room_id, b.room_id, "room clash: {:?} / {:?}", a, b);
            assert_ne!(a.section_id, b.section_id, "section clash: {:?} / {:?}", a, b);
        }
    }
}

#[test]
fn test_no_overlap_on_every_output() {
    init_logger();
    for with_ilp in [false, true] {
        let output = solve(&department(), with_ilp);
        assert!(!output.slots.is_empty());
        assert_no_overlap(&output.slots);
    }
}

#[test]
fn test_no_overlap_on_an_overloaded_instance() {
    init_logger();
    let mut input = department();
    // far more demand than one lab room and two lecture halls can hold
    input.rooms.retain(|r| r.id != "LAB-2" && r.id != "LH-3");
    for i in 0..6 {
        input.courses.push(theory(&format!("X{}", i), "EXTRA", 8, "F-X", 20));
    }
    let output = solve(&input, false);
    assert!(!output.unscheduled.is_empty());
    assert_no_overlap(&output.slots);
}

#[test]
fn test_lab_block_integrity() {
    let input = department();
    let output = solve(&input, true);
    let labs: Vec<_> = input.courses.iter().filter(|c| c.is_lab()).collect();
    for course in labs {
        let blocks: Vec<&TimetableSlot> = output
            .slots
            .iter()
            .filter(|s| s.course_key() == course.key())
            .collect();
        assert!(blocks.len() <= 1, "{} split into {} blocks", course.key(), blocks.len());
        for block in blocks {
            assert_eq!(block.span(), 4);
        }
    }
}

#[test]
fn test_capacity_and_kind_respected() {
    let input = department();
    let output = solve(&input, false);
    for slot in &output.slots {
        let course = input
            .courses
            .iter()
            .find(|c| c.key() == slot.course_key())
            .unwrap();
        let room = input.rooms.iter().find(|r| r.id == slot.room_id).unwrap();
        assert!(room.capacity >= course.student_count, "{:?} in {}", slot, room.id);
        assert_eq!(room.kind, course.subject_kind);
    }
}

#[test]
fn test_availability_containment() {
    let input = department();
    let output = solve(&input, false);
    for slot in output.slots.iter().filter(|s| s.faculty_id == "F-EE" || s.faculty_id == "F-PHY") {
        let inside = input.availability.iter().any(|w| {
            w.faculty_id == slot.faculty_id
                && w.day == slot.day
                && w.start_period <= slot.start_period
                && slot.end_period <= w.end_period
        });
        assert!(inside, "{:?} outside declared windows", slot);
    }
}

#[test]
fn test_theory_phase_is_deterministic() {
    let input = department();
    let problem = ProblemIndex::new(&input, SchedulingRules::default());
    let options = EngineOptions::default();

    let run = || {
        let mut ctx = SchedulingContext::new();
        run_lab_phase(&problem, &mut ctx, None);
        run_theory_phase(&problem, &ctx, &options, None)
    };
    let first = run();
    let second = run();
    assert_eq!(first.scores, second.scores);
    assert_eq!(first.best_attempt, second.best_attempt);
    assert_eq!(first.best.slots(), second.best.slots());
}

#[test]
fn test_whole_pipeline_is_deterministic() {
    let a = solve(&department(), false);
    let b = solve(&department(), false);
    assert_eq!(a.slots, b.slots);
    assert_eq!(a.unscheduled, b.unscheduled);
}

#[test]
fn test_refinement_is_monotonic_and_never_loses_periods() {
    let input = department();
    let problem = ProblemIndex::new(&input, SchedulingRules::default());
    let options = EngineOptions::default();
    let mut ctx = SchedulingContext::new();
    run_lab_phase(&problem, &mut ctx, None);
    let theory = run_theory_phase(&problem, &ctx, &options, None);
    let before = theory.best.total_periods_placed();

    let outcome = refine(&problem, theory.best, &options.refinement, options.seed, None);
    assert!(outcome.history.windows(2).all(|w| w[1] >= w[0]));
    assert_eq!(outcome.best.total_periods_placed(), before);
    assert!(audit_schedule(&problem, outcome.best.slots()).is_empty());
}

#[test]
fn test_feasible_instance_reruns_cleanly() {
    let input = SchedulingInput {
        courses: vec![lab("S1", "CHEM-LAB", 4, "F1", 25)],
        rooms: vec![room("L1", 30, SubjectKind::Lab)],
        availability: vec![],
    };
    for _ in 0..3 {
        for with_ilp in [false, true] {
            let output = solve(&input, with_ilp);
            assert!(output.unscheduled.is_empty());
            assert_eq!(output.slots.len(), 1);
        }
    }
}
