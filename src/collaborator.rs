//! Lab solver collaborator.
//!
//! The lab sub-problem (one contiguous block per lab course) may be handed to
//! an external solver. Anything other than a well-formed success is treated
//! as "unreachable" by the caller, which then places labs itself.

use crate::data::{
    ClassroomOption, CourseAssignment, Day, FacultyAvailabilityWindow, Period, RoomId, SectionId,
    SubjectId,
};
use crate::error::CollaboratorError;
use crate::rules::SchedulingRules;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Grid rules sent along with a lab request.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabRules {
    pub block_length: u8,
    pub days_per_week: u8,
    pub periods_per_day: u8,
    #[serde(default = "default_lunch_after")]
    pub lunch_after_period: Period,
    #[serde(default)]
    pub allow_lunch_crossing: bool,
    #[serde(default)]
    pub partial_day: Option<Day>,
    #[serde(default = "default_lunch_after")]
    pub partial_day_last_period: Period,
    #[serde(default)]
    pub partial_day_full_access_years: Vec<u32>,
}

fn default_lunch_after() -> Period {
    4
}

impl LabRules {
    pub fn from_rules(rules: &SchedulingRules) -> Self {
        Self {
            block_length: rules.lab_block_length,
            days_per_week: rules.days_per_week,
            periods_per_day: rules.periods_per_day,
            lunch_after_period: rules.lunch_after_period,
            allow_lunch_crossing: rules.allow_lunch_crossing,
            partial_day: rules.partial_day,
            partial_day_last_period: rules.partial_day_last_period,
            partial_day_full_access_years: rules.partial_day_full_access_years.clone(),
        }
    }

    pub fn to_rules(&self) -> SchedulingRules {
        SchedulingRules {
            days_per_week: self.days_per_week,
            periods_per_day: self.periods_per_day,
            lunch_after_period: self.lunch_after_period,
            allow_lunch_crossing: self.allow_lunch_crossing,
            lab_block_length: self.block_length,
            partial_day: self.partial_day,
            partial_day_last_period: self.partial_day_last_period,
            partial_day_full_access_years: self.partial_day_full_access_years.clone(),
            ..SchedulingRules::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabSolveRequest {
    pub courses: Vec<CourseAssignment>,
    pub rooms: Vec<ClassroomOption>,
    #[serde(default)]
    pub faculty_availability: Vec<FacultyAvailabilityWindow>,
    pub rules: LabRules,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabAssignment {
    pub section_id: SectionId,
    pub subject_id: SubjectId,
    pub day: Day,
    pub start_period: Period,
    pub end_period: Period,
    pub room_id: RoomId,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabSolveResponse {
    pub success: bool,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub assignments: Vec<LabAssignment>,
    #[serde(default)]
    pub solve_time_ms: u64,
}

impl LabSolveResponse {
    pub fn infeasible(message: impl Into<String>, solve_time_ms: u64) -> Self {
        Self {
            success: false,
            status: "INFEASIBLE".to_string(),
            message: message.into(),
            assignments: Vec::new(),
            solve_time_ms,
        }
    }

    pub fn error(message: impl Into<String>, solve_time_ms: u64) -> Self {
        Self {
            success: false,
            status: "ERROR".to_string(),
            message: message.into(),
            assignments: Vec::new(),
            solve_time_ms,
        }
    }
}

/// Something able to solve the lab sub-problem.
pub trait LabSolver: Send + Sync {
    fn name(&self) -> &str;

    /// `Err` covers transport problems only; solver verdicts come back as a response.
    fn solve(&self, request: &LabSolveRequest) -> Result<LabSolveResponse, CollaboratorError>;
}

/// Posts lab requests to a remote `/solve-labs` endpoint.
#[derive(Debug, Clone)]
pub struct HttpLabSolver {
    base_url: String,
    timeout: Duration,
}

impl HttpLabSolver {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl LabSolver for HttpLabSolver {
    fn name(&self) -> &str {
        "http"
    }

    fn solve(&self, request: &LabSolveRequest) -> Result<LabSolveResponse, CollaboratorError> {
        let url = format!("{}/solve-labs", self.base_url);
        info!("Delegating {} lab(s) to {}", request.courses.len(), url);

        // blocking client; must not be created or dropped on the async runtime
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| CollaboratorError::Unreachable(e.to_string()))?;

        let response = client.post(&url).json(request).send().map_err(|e| {
            if e.is_timeout() {
                CollaboratorError::Timeout
            } else {
                CollaboratorError::Unreachable(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            warn!("Lab solver answered {}: {}", status, body);
            return Err(CollaboratorError::SolverError(format!("HTTP {}: {}", status, body)));
        }

        response
            .json::<LabSolveResponse>()
            .map_err(|e| CollaboratorError::Malformed(e.to_string()))
    }
}
