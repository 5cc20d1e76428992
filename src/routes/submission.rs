use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dto::submission_dto::{
    CreateSubmissionRequest, FinalSubmitRequest, SubmitQuestionRequest,
};
use crate::AppState;

#[axum::debug_handler]
pub async fn create_submission(
    State(state): State<AppState>,
    Json(req): Json<CreateSubmissionRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let (submission, created) = state
        .submission_service
        .get_or_create(&req.candidate_id, req.drive_id)
        .await?;
    let (status, message) = if created {
        (StatusCode::CREATED, "Submission created successfully")
    } else {
        (StatusCode::OK, "Submission already exists")
    };
    Ok((status, Json(json!({ "message": message, "submission": submission }))).into_response())
}

#[axum::debug_handler]
pub async fn submit_question(
    State(state): State<AppState>,
    Json(req): Json<SubmitQuestionRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let summary = state
        .submission_service
        .submit_question(
            &req.candidate_id,
            req.drive_id,
            req.question_id,
            &req.source_code,
            &req.language,
            req.time_taken,
        )
        .await?;
    Ok(Json(json!({
        "success": true,
        "result": summary.result,
        "test_cases_passed": summary.test_cases_passed,
        "total_test_cases": summary.total_test_cases,
        "results": summary.results,
    }))
    .into_response())
}

#[axum::debug_handler]
pub async fn final_submit(
    State(state): State<AppState>,
    Json(req): Json<FinalSubmitRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let statistics = state
        .submission_service
        .final_submit(&req.candidate_id, req.drive_id)
        .await?;
    Ok(Json(json!({
        "message": "Assessment submitted successfully",
        "statistics": statistics,
    }))
    .into_response())
}

#[axum::debug_handler]
pub async fn get_submission(
    State(state): State<AppState>,
    Path(submission_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let submission = state
        .submission_service
        .get_submission(submission_id)
        .await?;
    Ok(Json(json!({
        "message": "Submission retrieved successfully",
        "submission": submission,
    }))
    .into_response())
}

#[axum::debug_handler]
pub async fn get_statistics(
    State(state): State<AppState>,
    Path(submission_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let statistics = state
        .submission_service
        .get_statistics(submission_id)
        .await?;
    Ok(Json(json!({
        "message": "Statistics retrieved successfully",
        "statistics": statistics,
    }))
    .into_response())
}

#[axum::debug_handler]
pub async fn list_by_candidate(
    State(state): State<AppState>,
    Path(candidate_id): Path<String>,
) -> crate::error::Result<Response> {
    let submissions = state
        .submission_service
        .submissions_by_candidate(&candidate_id)
        .await?;
    let count = submissions.len();
    Ok(Json(json!({
        "message": format!("Retrieved {} submissions", count),
        "submissions": submissions,
        "count": count,
    }))
    .into_response())
}

#[axum::debug_handler]
pub async fn list_by_drive(
    State(state): State<AppState>,
    Path(drive_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let submissions = state
        .submission_service
        .submissions_by_drive(drive_id)
        .await?;
    let count = submissions.len();
    Ok(Json(json!({
        "message": format!("Retrieved {} submissions", count),
        "submissions": submissions,
        "count": count,
    }))
    .into_response())
}
