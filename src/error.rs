use crate::validate::ValidationError;
use std::fmt;

/// Failures talking to the lab solver. All of them lead to the per-course fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// No solver is configured.
    NotConfigured,
    Unreachable(String),
    Timeout,
    /// The reply did not describe one block per requested lab.
    Malformed(String),
    /// The solver answered but found no schedule.
    Infeasible(String),
    SolverError(String),
}

impl fmt::Display for CollaboratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollaboratorError::NotConfigured => write!(f, "no lab solver configured"),
            CollaboratorError::Unreachable(reason) => write!(f, "lab solver unreachable: {}", reason),
            CollaboratorError::Timeout => write!(f, "lab solver timed out"),
            CollaboratorError::Malformed(reason) => {
                write!(f, "lab solver returned a malformed response: {}", reason)
            }
            CollaboratorError::Infeasible(message) => {
                write!(f, "lab solver reported infeasibility: {}", message)
            }
            CollaboratorError::SolverError(message) => write!(f, "lab solver failed: {}", message),
        }
    }
}

impl std::error::Error for CollaboratorError {}

/// Errors the engine facade surfaces to callers.
///
/// Expected infeasibility is not an error; it is reported through
/// `ScheduleOutput::unscheduled`.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    InvalidInput(Vec<ValidationError>),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidInput(errors) => {
                write!(f, "invalid scheduling input ({} problem(s))", errors.len())?;
                for error in errors {
                    write!(f, "\n  {}", error)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for EngineError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ValidationErrorKind;

    #[test]
    fn test_engine_error_lists_every_problem() {
        let err = EngineError::InvalidInput(vec![
            ValidationError::new(ValidationErrorKind::DuplicateRoom, "Duplicate room ID: R1"),
            ValidationError::new(ValidationErrorKind::ZeroPeriods, "Course S1:MATH has no periods"),
        ]);
        let text = err.to_string();
        assert!(text.starts_with("invalid scheduling input (2 problem(s))"));
        assert!(text.contains("Duplicate room ID: R1"));
        assert!(text.contains("S1:MATH"));
    }

    #[test]
    fn test_collaborator_error_display() {
        assert_eq!(CollaboratorError::Timeout.to_string(), "lab solver timed out");
        assert!(
            CollaboratorError::Unreachable("connection refused".into())
                .to_string()
                .contains("connection refused")
        );
    }
}
