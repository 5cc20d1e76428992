use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSubmissionRequest {
    #[validate(length(min = 1, message = "candidate_id is required"))]
    pub candidate_id: String,
    pub drive_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitQuestionRequest {
    #[validate(length(min = 1, message = "candidate_id is required"))]
    pub candidate_id: String,
    pub drive_id: Uuid,
    pub question_id: Uuid,
    #[validate(length(min = 1, message = "source_code is required"))]
    pub source_code: String,
    #[validate(length(min = 1, message = "language is required"))]
    pub language: String,
    #[serde(default)]
    pub time_taken: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FinalSubmitRequest {
    #[validate(length(min = 1, message = "candidate_id is required"))]
    pub candidate_id: String,
    pub drive_id: Uuid,
}
