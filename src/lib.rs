//! Constraint-based weekly timetable engine.
//!
//! Labs are placed first (by an ILP lab solver when one is available, by
//! greedy slot search otherwise), theory courses follow over several
//! ordered attempts, and a genetic pass improves soft-constraint quality
//! without touching hard constraints.

pub mod collaborator;
pub mod config;
pub mod context;
pub mod data;
pub mod engine;
pub mod error;
pub mod lab_phase;
pub mod ledger;
pub mod ordering;
pub mod refine;
pub mod rules;
pub mod search;
pub mod server;
pub mod solver;
pub mod theory_phase;
pub mod validate;

pub use data::{
    ClassroomOption, CourseAssignment, FacultyAvailabilityWindow, ScheduleOutput, SchedulingInput,
    SubjectKind, TimetableSlot, UnscheduledCourse,
};
pub use engine::TimetableEngine;
pub use error::{CollaboratorError, EngineError};
pub use rules::{EngineOptions, RefinementOptions, SchedulingRules};
