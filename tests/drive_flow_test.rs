use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::{get, patch, post},
    Router,
};
use driveflow_backend::error::{Error, Result};
use driveflow_backend::services::judge_service::{Judge, JudgeResponse};
use driveflow_backend::store::MemoryStore;
use driveflow_backend::AppState;
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

/// Drive-flow tests never reach the judge.
struct UnreachableJudge;

#[async_trait]
impl Judge for UnreachableJudge {
    async fn submit_and_wait(&self, _: &str, _: i32, _: &str) -> Result<JudgeResponse> {
        Err(Error::ExternalService("no judge in this test".into()))
    }
}

fn test_state(store: Arc<MemoryStore>) -> AppState {
    AppState::new(
        store,
        Arc::new(UnreachableJudge),
        "http://localhost/webhook".to_string(),
        1,
    )
}

fn drive_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/drives",
            get(driveflow_backend::routes::drive::list_drives)
                .post(driveflow_backend::routes::drive::create_drive),
        )
        .route(
            "/api/drives/:id",
            get(driveflow_backend::routes::drive::get_drive),
        )
        .route(
            "/api/drives/:id/status",
            patch(driveflow_backend::routes::drive::update_drive_status),
        )
        .route(
            "/api/drives/:id/progress",
            get(driveflow_backend::routes::drive::get_progress),
        )
        .route(
            "/api/drives/:id/candidates",
            get(driveflow_backend::routes::drive::list_candidates)
                .post(driveflow_backend::routes::drive::enroll_candidate),
        )
        .route(
            "/api/drives/:id/round-outcome",
            post(driveflow_backend::routes::drive::record_round_outcome),
        )
        .route(
            "/api/drives/:id/finalize-selection",
            post(driveflow_backend::routes::drive::finalize_selection),
        )
        .with_state(state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<JsonValue>) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            builder.body(Body::from(value.to_string())).unwrap()
        }
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let value = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn drive_lifecycle_end_to_end() {
    let store = Arc::new(MemoryStore::new());
    let app = drive_router(test_state(store.clone()));

    let (status, body) = send(
        &app,
        "POST",
        "/api/drives",
        Some(json!({
            "company_id": "acme",
            "job_id": "acme-be-01",
            "role": "Backend Engineer",
            "candidates_to_hire": 1,
            "skills": ["rust", "sql"],
            "rounds": [{"type": "HR"}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let drive_id = body["drive"]["id"].as_str().unwrap().to_string();

    // Catalog and tracking arrays stay aligned, round numbers are 1-based.
    let round_statuses = body["drive"]["round_statuses"].as_array().unwrap();
    let rounds = body["drive"]["rounds"].as_array().unwrap();
    assert_eq!(round_statuses.len(), rounds.len());
    assert_eq!(round_statuses[0]["round_number"], 1);
    assert_eq!(round_statuses[0]["round_id"], rounds[0]["round_id"]);
    assert_eq!(body["drive"]["current_round"], 0);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/drives/{}/candidates", drive_id),
        Some(json!({
            "candidate_id": "cand-1",
            "email": "alice@example.com",
            "resume_content": "Rust and SQL backend engineer."
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Shortlisting lazily initializes the candidate's round array.
    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/drives/{}/status", drive_id),
        Some(json!({"status": "resumeShortlisted"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["shortlist"]["shortlisted"], 1);

    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/drives/{}/candidates", drive_id),
        None,
    )
    .await;
    let entry = &body["candidates"][0]["candidate"]["rounds_status"][0];
    assert_eq!(entry["round_number"], 1);
    assert_eq!(entry["status"], "pending");
    assert_eq!(entry["scheduled"], false);
    assert_eq!(entry["completed"], false);

    // A candidate enrolled after shortlisting has no round array yet and is
    // silently skipped by the fan-out.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/drives/{}/candidates", drive_id),
        Some(json!({"candidate_id": "cand-late", "email": "late@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Scheduling defaults to current_round + 1 and fans out to candidates.
    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/drives/{}/status", drive_id),
        Some(json!({"status": "ROUND_SCHEDULING"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["round_number"], 1);
    assert_eq!(body["round_type"], "HR");
    assert_eq!(body["fan_out"]["updated"], 1);
    assert_eq!(body["fan_out"]["skipped"], 1);

    let (_, body) = send(&app, "GET", &format!("/api/drives/{}", drive_id), None).await;
    assert_eq!(body["drive"]["current_round"], 1);
    assert_eq!(body["drive"]["round_statuses"][0]["status"], "in_progress");
    assert_eq!(body["drive"]["round_statuses"][0]["scheduled"], true);

    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/drives/{}/candidates", drive_id),
        None,
    )
    .await;
    let entry = &body["candidates"][0]["candidate"]["rounds_status"][0];
    assert_eq!(entry["status"], "in_progress");
    assert_eq!(entry["scheduled"], true);
    assert!(entry["interview_link"].is_string());

    assert_eq!(store.jobs_with_event("interview_invite"), 1);

    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/drives/{}/progress", drive_id),
        None,
    )
    .await;
    assert_eq!(body["round_details"][0]["scheduled_count"], 1);
    assert_eq!(body["total_candidates"], 1);

    // Evaluation collaborator records the outcome, then the round completes.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/drives/{}/round-outcome", drive_id),
        Some(json!({
            "candidate_id": "cand-1",
            "round_number": 1,
            "result": "passed",
            "score": 87.5
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/drives/{}/status", drive_id),
        Some(json!({"status": "ROUND_COMPLETED", "round_number": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["next_round"].is_null());

    // Completing the last round does not advance the drive on its own.
    let (_, body) = send(&app, "GET", &format!("/api/drives/{}", drive_id), None).await;
    assert_ne!(body["drive"]["status"], "selectionEmailSent");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/drives/{}/finalize-selection", drive_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["selected"], 1);
    assert_eq!(body["rejected"], 0);

    let (_, body) = send(&app, "GET", &format!("/api/drives/{}", drive_id), None).await;
    assert_eq!(body["drive"]["status"], "selectionEmailSent");
    assert_eq!(store.jobs_with_event("selection_email"), 1);
}

#[tokio::test]
async fn finalize_requires_all_rounds_completed() {
    let store = Arc::new(MemoryStore::new());
    let app = drive_router(test_state(store));

    let (_, body) = send(
        &app,
        "POST",
        "/api/drives",
        Some(json!({
            "company_id": "acme",
            "job_id": "acme-be-02",
            "role": "Backend Engineer",
            "candidates_to_hire": 1,
            "rounds": [{"type": "coding"}, {"type": "HR"}]
        })),
    )
    .await;
    let drive_id = body["drive"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/drives/{}/finalize-selection", drive_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_transitions_are_rejected() {
    let store = Arc::new(MemoryStore::new());
    let app = drive_router(test_state(store));

    let (_, body) = send(
        &app,
        "POST",
        "/api/drives",
        Some(json!({
            "company_id": "acme",
            "job_id": "acme-be-03",
            "role": "Backend Engineer",
            "candidates_to_hire": 1,
            "rounds": [{"type": "HR"}]
        })),
    )
    .await;
    let drive_id = body["drive"]["id"].as_str().unwrap().to_string();

    // Unknown status name.
    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/drives/{}/status", drive_id),
        Some(json!({"status": "TOTALLY_BOGUS"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Scheduling past the last round.
    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/drives/{}/status", drive_id),
        Some(json!({"status": "ROUND_SCHEDULING", "round_number": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Completion without a round number.
    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/drives/{}/status", drive_id),
        Some(json!({"status": "ROUND_COMPLETED"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Duplicate job ids are refused.
    let (status, _) = send(
        &app,
        "POST",
        "/api/drives",
        Some(json!({
            "company_id": "acme",
            "job_id": "acme-be-03",
            "role": "Backend Engineer",
            "candidates_to_hire": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
