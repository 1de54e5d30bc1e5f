use crate::collaborator::{LabSolveRequest, LabSolveResponse, LabSolver};
use crate::config::ServiceConfig;
use crate::data::{ScheduleOutput, SchedulingInput};
use crate::engine::TimetableEngine;
use crate::error::EngineError;
use crate::rules::{EngineOptions, SchedulingRules};
use crate::solver::solve_labs;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

/// Solve request: the scheduling input plus optional per-request rules and options.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    #[serde(flatten)]
    pub input: SchedulingInput,
    #[serde(default)]
    pub rules: Option<SchedulingRules>,
    #[serde(default)]
    pub options: Option<EngineOptions>,
}

#[derive(Clone)]
pub struct AppState {
    config: Arc<ServiceConfig>,
    lab_solver: Option<Arc<dyn LabSolver>>,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Self {
        let lab_solver = config.lab_solver();
        Self {
            config: Arc::new(config),
            lab_solver,
        }
    }
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: String, details: Vec<String>) -> ApiError {
    (status, Json(json!({ "error": message, "details": details })))
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "timetable_engine",
        "labSolver": state.lab_solver.as_ref().map(|s| s.name()),
    }))
}

async fn solve_handler(
    State(state): State<AppState>,
    Json(request): Json<SolveRequest>,
) -> Result<Json<ScheduleOutput>, ApiError> {
    let rules = request.rules.unwrap_or_else(|| state.config.rules.clone());
    let options = request.options.unwrap_or_else(|| state.config.options.clone());
    let mut engine = TimetableEngine::new(rules, options);
    if let Some(solver) = state.lab_solver.clone() {
        engine = engine.with_lab_solver(solver);
    }

    // the engine blocks, and may itself block on the lab solver
    let input = request.input;
    let outcome = tokio::task::spawn_blocking(move || engine.solve(&input))
        .await
        .map_err(|e| {
            error!("Solve task failed: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), Vec::new())
        })?;

    match outcome {
        Ok(output) => Ok(Json(output)),
        Err(err) => {
            let EngineError::InvalidInput(errors) = &err;
            let details = errors.iter().map(ToString::to_string).collect();
            Err(api_error(StatusCode::BAD_REQUEST, err.to_string(), details))
        }
    }
}

async fn solve_labs_handler(
    State(state): State<AppState>,
    Json(request): Json<LabSolveRequest>,
) -> Json<LabSolveResponse> {
    let time_limit = Duration::from_secs(state.config.ilp_time_limit_secs);
    let response = tokio::task::spawn_blocking(move || solve_labs(&request, time_limit))
        .await
        .unwrap_or_else(|e| LabSolveResponse::error(e.to_string(), 0));
    Json(response)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/v1/timetable/solve", post(solve_handler))
        .route("/solve-labs", post(solve_labs_handler))
        .with_state(state)
}

pub async fn run_server(config: ServiceConfig) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("Server running at http://{}", listener.local_addr()?);
    axum::serve(listener, router(AppState::new(config))).await
}
