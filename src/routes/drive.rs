use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dto::drive_dto::{
    CreateDriveRequest, EnrollCandidateRequest, RoundOutcomeRequest, UpdateDeadlinesRequest,
    UpdateDriveStatusRequest,
};
use crate::services::drive_service::TransitionOutcome;
use crate::AppState;

#[axum::debug_handler]
pub async fn create_drive(
    State(state): State<AppState>,
    Json(req): Json<CreateDriveRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let rounds_count = req.rounds.len().max(1);
    let questions_count = req.coding_questions.len();
    let drive = state.drive_service.create_drive(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Drive created successfully",
            "drive": drive,
            "coding_questions_count": questions_count,
            "rounds_count": rounds_count,
        })),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct ListDrivesQuery {
    pub company_id: Option<String>,
}

#[axum::debug_handler]
pub async fn list_drives(
    State(state): State<AppState>,
    Query(query): Query<ListDrivesQuery>,
) -> crate::error::Result<Response> {
    let drives = state
        .drive_service
        .list_drives(query.company_id.as_deref())
        .await?;
    let body: Vec<_> = drives
        .into_iter()
        .map(|(drive, progress)| json!({ "drive": drive, "progress": progress }))
        .collect();
    let count = body.len();
    Ok(Json(json!({ "drives": body, "count": count })).into_response())
}

#[axum::debug_handler]
pub async fn get_drive(
    State(state): State<AppState>,
    Path(drive_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let drive = state.drive_service.get_drive(drive_id).await?;
    let progress = state.drive_service.progress(drive_id).await?;
    Ok(Json(json!({
        "message": "Drive retrieved successfully",
        "drive": drive,
        "round_progress": progress.round_details,
    }))
    .into_response())
}

#[axum::debug_handler]
pub async fn update_drive_status(
    State(state): State<AppState>,
    Path(drive_id): Path<Uuid>,
    Json(req): Json<UpdateDriveStatusRequest>,
) -> crate::error::Result<Response> {
    let outcome = state.drive_service.update_status(drive_id, req).await?;
    let body = match outcome {
        TransitionOutcome::StatusUpdated { status, shortlist } => json!({
            "message": "Drive status updated successfully",
            "status": status,
            "drive_id": drive_id,
            "shortlist": shortlist,
        }),
        TransitionOutcome::RoundScheduled {
            round_number,
            round_type,
            fan_out,
        } => json!({
            "message": format!("Round {} scheduling initiated", round_number),
            "round_number": round_number,
            "round_type": round_type,
            "drive_id": drive_id,
            "fan_out": fan_out,
        }),
        TransitionOutcome::RoundCompleted {
            round_number,
            next_round,
            next_round_type,
            fan_out,
        } => json!({
            "message": format!("Round {} completed", round_number),
            "next_round": next_round,
            "next_round_type": next_round_type,
            "fan_out": fan_out,
        }),
    };
    Ok(Json(body).into_response())
}

#[axum::debug_handler]
pub async fn get_progress(
    State(state): State<AppState>,
    Path(drive_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let progress = state.drive_service.progress(drive_id).await?;
    Ok(Json(progress).into_response())
}

#[axum::debug_handler]
pub async fn enroll_candidate(
    State(state): State<AppState>,
    Path(drive_id): Path<Uuid>,
    Json(req): Json<EnrollCandidateRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let candidate = state.drive_service.enroll_candidate(drive_id, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Candidate enrolled successfully",
            "candidate": candidate,
        })),
    )
        .into_response())
}

#[axum::debug_handler]
pub async fn list_candidates(
    State(state): State<AppState>,
    Path(drive_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let candidates = state.drive_service.drive_candidates(drive_id).await?;
    let body: Vec<_> = candidates
        .iter()
        .map(|c| {
            json!({
                "candidate": c,
                "progress": {
                    "current_round": c.current_round,
                    "completed_rounds": c.completed_rounds(),
                    "total_rounds": c.rounds_status.len(),
                }
            })
        })
        .collect();
    let count = body.len();
    Ok(Json(json!({ "candidates": body, "count": count })).into_response())
}

#[axum::debug_handler]
pub async fn list_shortlisted(
    State(state): State<AppState>,
    Path(drive_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let candidates = state.drive_service.shortlisted_candidates(drive_id).await?;
    let count = candidates.len();
    Ok(Json(json!({ "candidates": candidates, "count": count })).into_response())
}

#[axum::debug_handler]
pub async fn list_selected(
    State(state): State<AppState>,
    Path(drive_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let candidates = state.drive_service.selected_candidates(drive_id).await?;
    let count = candidates.len();
    Ok(Json(json!({ "candidates": candidates, "count": count })).into_response())
}

#[axum::debug_handler]
pub async fn finalize_selection(
    State(state): State<AppState>,
    Path(drive_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let report = state.drive_service.finalize_selection(drive_id).await?;
    Ok(Json(json!({
        "message": "Final selection recorded",
        "selected": report.selected,
        "rejected": report.rejected,
    }))
    .into_response())
}

#[axum::debug_handler]
pub async fn record_round_outcome(
    State(state): State<AppState>,
    Path(drive_id): Path<Uuid>,
    Json(req): Json<RoundOutcomeRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    state.drive_service.record_round_outcome(drive_id, req).await?;
    Ok(Json(json!({ "message": "Round outcome recorded" })).into_response())
}

#[axum::debug_handler]
pub async fn update_deadlines(
    State(state): State<AppState>,
    Path(drive_id): Path<Uuid>,
    Json(req): Json<UpdateDeadlinesRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let reports = state
        .drive_service
        .update_round_deadlines(drive_id, req)
        .await?;
    Ok(Json(json!({
        "message": "Deadlines updated successfully",
        "fan_out": reports,
    }))
    .into_response())
}

#[axum::debug_handler]
pub async fn get_active_deadline(
    State(state): State<AppState>,
    Path(drive_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let drive = state.drive_service.get_drive(drive_id).await?;
    let deadline = state.drive_service.active_round_deadline(drive_id).await?;
    Ok(Json(json!({
        "drive_id": drive_id,
        "current_round": drive.current_round,
        "deadline": deadline,
        "status": "success",
    }))
    .into_response())
}
