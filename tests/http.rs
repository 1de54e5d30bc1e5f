mod common;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use common::*;
use serde_json::{Value, json};
use timetable_engine::config::ServiceConfig;
use timetable_engine::server::{AppState, router};
use tower::ServiceExt;

fn app(in_process_lab_solver: bool) -> axum::Router {
    let mut config = ServiceConfig {
        in_process_lab_solver,
        ..ServiceConfig::default()
    };
    config.options = quick_options();
    router(AppState::new(config))
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn small_input() -> Value {
    json!({
        "courses": [
            {"sectionId": "S1", "subjectId": "MATH", "subjectKind": "theory", "periodsPerWeek": 4,
             "facultyId": "F1", "studentCount": 30, "yearLevel": 2},
            {"sectionId": "S1", "subjectId": "CHEM-LAB", "subjectKind": "lab", "periodsPerWeek": 4,
             "facultyId": "F2", "studentCount": 30, "yearLevel": 2}
        ],
        "rooms": [
            {"id": "R1", "capacity": 40, "kind": "theory"},
            {"id": "L1", "capacity": 40, "kind": "lab"}
        ]
    })
}

#[tokio::test]
async fn test_health() {
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, body) = send(app(true), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["labSolver"], "highs-ilp");
}

#[tokio::test]
async fn test_solve_returns_schedule() {
    init_logger();
    let (status, body) = send(app(false), post("/v1/timetable/solve", small_input())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unscheduled"].as_array().unwrap().len(), 0);
    let slots = body["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 3);
    assert!(slots.iter().all(|s| s["roomId"].is_string() && s["startPeriod"].is_u64()));
}

#[tokio::test]
async fn test_solve_accepts_request_rules() {
    let mut input = small_input();
    input["courses"][1]["periodsPerWeek"] = json!(3);
    input["rules"] = json!({"labBlockLength": 3});
    let (status, body) = send(app(true), post("/v1/timetable/solve", input)).await;
    assert_eq!(status, StatusCode::OK);
    let lab = body["slots"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["subjectId"] == "CHEM-LAB")
        .cloned()
        .unwrap();
    assert_eq!(lab["endPeriod"].as_u64().unwrap() - lab["startPeriod"].as_u64().unwrap(), 2);
}

#[tokio::test]
async fn test_invalid_input_is_bad_request() {
    let mut input = small_input();
    input["courses"][0]["periodsPerWeek"] = json!(0);
    input["rooms"] = json!([{"id": "R1", "capacity": 40, "kind": "theory"}]);
    let (status, body) = send(app(false), post("/v1/timetable/solve", input)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let details = body["details"].as_array().unwrap();
    // zero periods, and a lab with no lab room
    assert_eq!(details.len(), 2);
}

#[tokio::test]
async fn test_solve_labs_endpoint() {
    let request = json!({
        "courses": [
            {"sectionId": "S1", "subjectId": "BIO-LAB", "subjectKind": "lab", "periodsPerWeek": 4,
             "facultyId": "F1", "studentCount": 20, "yearLevel": 1},
            {"sectionId": "S2", "subjectId": "BIO-LAB", "subjectKind": "lab", "periodsPerWeek": 4,
             "facultyId": "F1", "studentCount": 20, "yearLevel": 1}
        ],
        "rooms": [{"id": "L1", "capacity": 25, "kind": "lab"}],
        "rules": {"blockLength": 4, "daysPerWeek": 6, "periodsPerDay": 8}
    });
    let (status, body) = send(app(false), post("/solve-labs", request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["assignments"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_solve_labs_rejects_inverted_window() {
    let request = json!({
        "courses": [
            {"sectionId": "S1", "subjectId": "BIO-LAB", "subjectKind": "lab", "periodsPerWeek": 4,
             "facultyId": "F1", "studentCount": 20, "yearLevel": 1}
        ],
        "rooms": [{"id": "L1", "capacity": 25, "kind": "lab"}],
        "facultyAvailability": [{"facultyId": "F1", "day": 2, "startPeriod": 7, "endPeriod": 3}],
        "rules": {"blockLength": 4, "daysPerWeek": 6, "periodsPerDay": 8}
    });
    let (status, body) = send(app(false), post("/solve-labs", request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], "ERROR");
}
