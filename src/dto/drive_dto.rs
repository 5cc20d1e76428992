use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::coding_question::TestCase;
use crate::models::drive::{DriveStatus, JobType};
use crate::models::drive_candidate::RoundResult;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRound {
    #[serde(rename = "type")]
    pub round_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCodingQuestion {
    #[validate(length(min = 1))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "testCases", alias = "test_cases", default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub constraints: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub time_limit: Option<i32>,
    #[serde(default)]
    pub memory_limit: Option<i32>,
}

fn default_difficulty() -> String {
    "medium".to_string()
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateDriveRequest {
    #[validate(length(min = 1, message = "company_id is required"))]
    pub company_id: String,
    #[validate(length(min = 1, message = "job_id is required"))]
    pub job_id: String,
    #[validate(length(min = 1, message = "role is required"))]
    pub role: String,
    #[serde(default)]
    pub location: Option<String>,
    #[validate(range(min = 1, message = "candidates_to_hire must be >= 1"))]
    pub candidates_to_hire: i32,
    #[serde(default)]
    pub job_type: Option<JobType>,
    #[serde(default)]
    pub internship_duration: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub rounds: Vec<CreateRound>,
    #[serde(default)]
    pub coding_questions: Vec<CreateCodingQuestion>,
}

/// Transition request vocabulary: the stored statuses plus the two
/// round-level transition names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveTransition {
    Status(DriveStatus),
    ScheduleRound,
    CompleteRound,
}

impl DriveTransition {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "ROUND_SCHEDULING" => Some(Self::ScheduleRound),
            "ROUND_COMPLETED" => Some(Self::CompleteRound),
            other => DriveStatus::from_str(other).map(Self::Status),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDriveStatusRequest {
    pub status: String,
    #[serde(default)]
    pub round_number: Option<i32>,
    #[serde(default)]
    pub round_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EnrollCandidateRequest {
    #[validate(length(min = 1, message = "candidate_id is required"))]
    pub candidate_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub resume_content: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeadlineUpdate {
    pub round_number: i32,
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateDeadlinesRequest {
    #[validate(length(min = 1, message = "No deadline data provided"))]
    pub deadlines: Vec<DeadlineUpdate>,
}

/// Outcome of one interview/assessment round for one candidate, written by
/// the evaluation collaborator.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RoundOutcomeRequest {
    #[validate(length(min = 1, message = "candidate_id is required"))]
    pub candidate_id: String,
    pub round_number: i32,
    pub result: RoundResult,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressSummary {
    pub current_round: i32,
    pub total_rounds: usize,
    pub percentage: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_parses_round_names_and_statuses() {
        assert_eq!(
            DriveTransition::parse("ROUND_SCHEDULING"),
            Some(DriveTransition::ScheduleRound)
        );
        assert_eq!(
            DriveTransition::parse("ROUND_COMPLETED"),
            Some(DriveTransition::CompleteRound)
        );
        assert_eq!(
            DriveTransition::parse("resumeShortlisted"),
            Some(DriveTransition::Status(DriveStatus::ResumeShortlisted))
        );
        assert_eq!(DriveTransition::parse("nonsense"), None);
    }
}
