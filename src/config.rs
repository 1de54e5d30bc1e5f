//! Service configuration.
//!
//! Read from the JSON file named by `TIMETABLE_CONFIG` when set, then
//! overridden by `TIMETABLE_BIND` and `LAB_SOLVER_URL`.

use crate::collaborator::{HttpLabSolver, LabSolver};
use crate::rules::{EngineOptions, SchedulingRules};
use crate::solver::IlpLabSolver;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const CONFIG_ENV: &str = "TIMETABLE_CONFIG";
pub const BIND_ENV: &str = "TIMETABLE_BIND";
pub const LAB_SOLVER_URL_ENV: &str = "LAB_SOLVER_URL";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceConfig {
    pub bind: String,
    /// Remote `/solve-labs` service. Takes precedence over the in-process solver.
    pub lab_solver_url: Option<String>,
    pub lab_solver_timeout_ms: u64,
    /// Solve labs with the built-in ILP when no remote solver is set.
    pub in_process_lab_solver: bool,
    pub ilp_time_limit_secs: u64,
    pub rules: SchedulingRules,
    pub options: EngineOptions,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            lab_solver_url: None,
            lab_solver_timeout_ms: 30_000,
            in_process_lab_solver: true,
            ilp_time_limit_secs: 60,
            rules: SchedulingRules::default(),
            options: EngineOptions::default(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(path, err) => write!(f, "cannot read {}: {}", path.display(), err),
            ConfigError::Parse(err) => write!(f, "invalid configuration: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(_, err) => Some(err),
            ConfigError::Parse(err) => Some(err),
        }
    }
}

impl ServiceConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(ConfigError::Parse)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_json(&text)
    }

    /// Applies environment overrides; `lookup` stands in for `std::env::var`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup(BIND_ENV).filter(|v| !v.trim().is_empty()) {
            self.bind = bind;
        }
        if let Some(url) = lookup(LAB_SOLVER_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.lab_solver_url = Some(url);
        }
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let base = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };
        Ok(base.with_overrides(|key| std::env::var(key).ok()))
    }

    pub fn lab_solver(&self) -> Option<Arc<dyn LabSolver>> {
        let solver: Arc<dyn LabSolver> = match &self.lab_solver_url {
            Some(url) => Arc::new(HttpLabSolver::new(
                url,
                Duration::from_millis(self.lab_solver_timeout_ms),
            )),
            None if self.in_process_lab_solver => {
                Arc::new(IlpLabSolver::new(Duration::from_secs(self.ilp_time_limit_secs)))
            }
            None => return None,
        };
        Some(solver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = ServiceConfig::from_json(
            r#"{"labSolverTimeoutMs": 500, "rules": {"labBlockLength": 3}, "options": {"maxAttempts": 4}}"#,
        )
        .unwrap();
        assert_eq!(config.lab_solver_timeout_ms, 500);
        assert_eq!(config.rules.lab_block_length, 3);
        assert_eq!(config.rules.days_per_week, 6);
        assert_eq!(config.options.max_attempts, 4);
        assert_eq!(config.options.seed, 42);
        assert_eq!(config.bind, "127.0.0.1:8080");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (BIND_ENV, "0.0.0.0:9000"),
            (LAB_SOLVER_URL_ENV, "http://solver:8000"),
        ]);
        let config = ServiceConfig::default().with_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.lab_solver_url.as_deref(), Some("http://solver:8000"));
        assert_eq!(config.lab_solver().map(|s| s.name().to_string()).as_deref(), Some("http"));
    }

    #[test]
    fn test_lab_solver_selection() {
        let config = ServiceConfig::default();
        assert_eq!(config.lab_solver().map(|s| s.name().to_string()).as_deref(), Some("highs-ilp"));
        let none = ServiceConfig {
            in_process_lab_solver: false,
            ..ServiceConfig::default()
        };
        assert!(none.lab_solver().is_none());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ServiceConfig::load(Path::new("/nonexistent/timetable.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_, _)));
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        assert!(matches!(
            ServiceConfig::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
