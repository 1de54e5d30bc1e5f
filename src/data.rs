use serde::{Deserialize, Serialize};
use std::fmt;

// Type aliases for clarity
pub type SectionId = String;
pub type SubjectId = String;
pub type FacultyId = String;
pub type RoomId = String;
pub type Day = u8;
pub type Period = u8;

/// Whether a subject (and the room it needs) is a lecture or a laboratory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Theory,
    Lab,
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectKind::Theory => write!(f, "theory"),
            SubjectKind::Lab => write!(f, "lab"),
        }
    }
}

/// One subject taught to one section. Immutable input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseAssignment {
    pub section_id: SectionId,
    pub subject_id: SubjectId,
    pub subject_kind: SubjectKind,
    pub periods_per_week: u32,
    pub faculty_id: FacultyId,
    pub student_count: u32,
    pub year_level: u32,
}

impl CourseAssignment {
    pub fn key(&self) -> CourseKey {
        CourseKey {
            section_id: self.section_id.clone(),
            subject_id: self.subject_id.clone(),
        }
    }

    pub fn is_lab(&self) -> bool {
        self.subject_kind == SubjectKind::Lab
    }
}

/// Identity of a course: one per (section, subject) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseKey {
    pub section_id: SectionId,
    pub subject_id: SubjectId,
}

impl fmt::Display for CourseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.section_id, self.subject_id)
    }
}

/// A room the engine may place sessions in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomOption {
    pub id: RoomId,
    pub capacity: u32,
    pub kind: SubjectKind,
}

/// Declares when a faculty member may teach. Periods are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyAvailabilityWindow {
    pub faculty_id: FacultyId,
    pub day: Day,
    pub start_period: Period,
    pub end_period: Period,
}

/// A single placed block in the output timetable. Periods are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableSlot {
    pub section_id: SectionId,
    pub subject_id: SubjectId,
    pub faculty_id: FacultyId,
    pub room_id: RoomId,
    pub day: Day,
    pub start_period: Period,
    pub end_period: Period,
}

impl TimetableSlot {
    pub fn span(&self) -> u32 {
        u32::from(self.end_period - self.start_period) + 1
    }

    pub fn course_key(&self) -> CourseKey {
        CourseKey {
            section_id: self.section_id.clone(),
            subject_id: self.subject_id.clone(),
        }
    }
}

/// A course whose weekly quota could not be met.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnscheduledCourse {
    pub course_id: String,
    pub section_id: SectionId,
    pub subject_id: SubjectId,
    pub periods_placed: u32,
    pub periods_required: u32,
}

impl fmt::Display for UnscheduledCourse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[unscheduled] {} placed {}/{} periods",
            self.course_id, self.periods_placed, self.periods_required
        )
    }
}

/// The complete input of the engine facade.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingInput {
    pub courses: Vec<CourseAssignment>,
    pub rooms: Vec<ClassroomOption>,
    #[serde(default)]
    pub availability: Vec<FacultyAvailabilityWindow>,
}

/// The final output of the engine.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOutput {
    pub slots: Vec<TimetableSlot>,
    pub unscheduled: Vec<UnscheduledCourse>,
    pub diagnostics: Vec<String>,
    /// Fitness of the returned slot list, when refinement ran.
    pub fitness: Option<f64>,
}

impl ScheduleOutput {
    pub fn periods_placed(&self) -> u32 {
        self.slots.iter().map(TimetableSlot::span).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_kind_wire_format() {
        let kind: SubjectKind = serde_json::from_str("\"lab\"").unwrap();
        assert_eq!(kind, SubjectKind::Lab);
        assert_eq!(serde_json::to_string(&SubjectKind::Theory).unwrap(), "\"theory\"");
        assert!(serde_json::from_str::<SubjectKind>("\"seminar\"").is_err());
    }

    #[test]
    fn test_course_assignment_camel_case() {
        let json = r#"{
            "sectionId": "S1", "subjectId": "PHY", "subjectKind": "lab",
            "periodsPerWeek": 4, "facultyId": "F1", "studentCount": 30, "yearLevel": 2
        }"#;
        let course: CourseAssignment = serde_json::from_str(json).unwrap();
        assert!(course.is_lab());
        assert_eq!(course.key().to_string(), "S1:PHY");
    }

    #[test]
    fn test_slot_span_is_inclusive() {
        let slot = TimetableSlot {
            section_id: "S1".into(),
            subject_id: "MATH".into(),
            faculty_id: "F1".into(),
            room_id: "R1".into(),
            day: 0,
            start_period: 2,
            end_period: 4,
        };
        assert_eq!(slot.span(), 3);
    }
}
