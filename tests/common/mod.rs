#![allow(dead_code)]

use timetable_engine::{
    ClassroomOption, CourseAssignment, EngineOptions, FacultyAvailabilityWindow, SchedulingInput,
    SubjectKind,
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn theory(section: &str, subject: &str, periods: u32, faculty: &str, students: u32) -> CourseAssignment {
    CourseAssignment {
        section_id: section.into(),
        subject_id: subject.into(),
        subject_kind: SubjectKind::Theory,
        periods_per_week: periods,
        faculty_id: faculty.into(),
        student_count: students,
        year_level: 2,
    }
}

pub fn lab(section: &str, subject: &str, periods: u32, faculty: &str, students: u32) -> CourseAssignment {
    CourseAssignment {
        subject_kind: SubjectKind::Lab,
        ..theory(section, subject, periods, faculty, students)
    }
}

pub fn room(id: &str, capacity: u32, kind: SubjectKind) -> ClassroomOption {
    ClassroomOption {
        id: id.into(),
        capacity,
        kind,
    }
}

pub fn window(faculty: &str, day: u8, start: u8, end: u8) -> FacultyAvailabilityWindow {
    FacultyAvailabilityWindow {
        faculty_id: faculty.into(),
        day,
        start_period: start,
        end_period: end,
    }
}

/// Short refinement so whole-pipeline tests stay quick.
pub fn quick_options() -> EngineOptions {
    let mut options = EngineOptions::default();
    options.refinement.population_size = 8;
    options.refinement.generations = 8;
    options
}

/// Three sections sharing four faculty members, with mixed room sizes and
/// a couple of restricted faculty.
pub fn department() -> SchedulingInput {
    let mut courses = Vec::new();
    for (section, students) in [("CSE-A", 55), ("CSE-B", 40), ("ECE-A", 30)] {
        courses.push(theory(section, "MATH", 4, "F-MATH", students));
        courses.push(theory(section, "PHY", 3, "F-PHY", students));
        courses.push(theory(section, "PROG", 4, "F-CS", students));
        courses.push(lab(section, "PROG-LAB", 4, "F-CS", students));
    }
    courses.push(theory("ECE-A", "CIRCUITS", 3, "F-EE", 30));

    SchedulingInput {
        courses,
        rooms: vec![
            room("LH-1", 60, SubjectKind::Theory),
            room("LH-2", 45, SubjectKind::Theory),
            room("LH-3", 35, SubjectKind::Theory),
            room("LAB-1", 60, SubjectKind::Lab),
            room("LAB-2", 40, SubjectKind::Lab),
        ],
        availability: vec![
            window("F-EE", 0, 1, 4),
            window("F-EE", 2, 1, 8),
            window("F-EE", 4, 5, 8),
            window("F-PHY", 0, 1, 8),
            window("F-PHY", 1, 1, 8),
            window("F-PHY", 2, 1, 8),
            window("F-PHY", 3, 1, 8),
        ],
    }
}
