use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::coding_question::TestCaseVisibility;

/// Placeholder stored and returned in place of private test-case data.
pub const HIDDEN_MARKER: &str = "[Hidden]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Running,
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionResult {
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    CompilationError,
    RuntimeError,
    InternalError,
    /// Test case could not be graded (no expected output on record).
    Invalid,
    /// Transport/timeout failure talking to the judge, or a grading-setup
    /// failure.
    Error,
}

/// Terminal status block reported by the judge, Judge0 numbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeStatus {
    pub id: i32,
    pub description: String,
}

impl JudgeStatus {
    pub fn invalid_test_case() -> Self {
        Self {
            id: -1,
            description: "Invalid Test Case".to_string(),
        }
    }

    pub fn execution_error() -> Self {
        Self {
            id: -1,
            description: "Execution Error".to_string(),
        }
    }
}

impl SubmissionResult {
    /// Classify one test case from the judge's terminal status and the
    /// trimmed stdout/expected pair. Judge execution statuses 3 and 4 mean
    /// the program ran; the verdict is then the output comparison. Other
    /// statuses map onto the judge's own error taxonomy.
    pub fn classify(status: &JudgeStatus, expected: &str, actual: &str) -> Self {
        match status.id {
            3 | 4 => {
                if expected == actual {
                    Self::Accepted
                } else {
                    Self::WrongAnswer
                }
            }
            5 => Self::TimeLimitExceeded,
            6 => Self::CompilationError,
            7..=12 | 14 => Self::RuntimeError,
            13 => Self::InternalError,
            _ => Self::Error,
        }
    }
}

/// Per-case grading record. Built already masked for private cases: the
/// visible fields hold [`HIDDEN_MARKER`] in both the persisted document and
/// every response; `result`, `status`, `time` and `memory` stay truthful.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub test_case_number: i32,
    #[serde(rename = "type")]
    pub visibility: TestCaseVisibility,
    pub status: JudgeStatus,
    pub stdin: String,
    pub expected: String,
    pub stdout: String,
    #[serde(default)]
    pub stderr: Option<String>,
    /// Judge-reported wall time, seconds.
    #[serde(default)]
    pub time: Option<f64>,
    /// Judge-reported peak memory, kilobytes.
    #[serde(default)]
    pub memory: Option<f64>,
    pub result: SubmissionResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSubmission {
    pub question_id: Uuid,
    /// Assigned on first submission of this question and never changed by
    /// re-submissions.
    pub question_number: i32,
    pub source_code: String,
    pub language: String,
    pub status: SubmissionStatus,
    #[serde(default)]
    pub result: Option<SubmissionResult>,
    pub test_cases_passed: i32,
    pub total_test_cases: i32,
    /// Cumulative judge execution time across cases, milliseconds.
    pub execution_time_ms: i64,
    /// Peak judge memory across cases, megabytes, rounded to 2 decimals.
    pub memory_used_mb: f64,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub test_case_results: Vec<TestCaseResult>,
    /// Candidate-reported seconds spent on the question.
    pub time_taken: i64,
    pub updated_at: DateTime<Utc>,
}

impl QuestionSubmission {
    pub fn new(
        question_id: Uuid,
        question_number: i32,
        source_code: String,
        language: String,
        total_test_cases: i32,
        time_taken: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            question_id,
            question_number,
            source_code,
            language,
            status: SubmissionStatus::Pending,
            result: None,
            test_cases_passed: 0,
            total_test_cases,
            execution_time_ms: 0,
            memory_used_mb: 0.0,
            error_message: None,
            test_case_results: Vec::new(),
            time_taken,
            updated_at: now,
        }
    }
}

/// One candidate's complete attempt at a drive's coding assessment.
/// `total_questions` is snapshotted at creation and never refreshed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub candidate_id: String,
    pub drive_id: Uuid,
    pub total_questions: i32,
    pub question_submissions: Vec<QuestionSubmission>,
    pub questions_solved: i32,
    pub score_percentage: Decimal,
    /// Sum of candidate-reported per-question seconds.
    pub total_time_taken: i64,
    pub status: SubmissionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(candidate_id: String, drive_id: Uuid, total_questions: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            candidate_id,
            drive_id,
            total_questions,
            question_submissions: Vec::new(),
            questions_solved: 0,
            score_percentage: Decimal::ZERO,
            total_time_taken: 0,
            status: SubmissionStatus::Pending,
            started_at: now,
            submitted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn question_submission(&self, question_id: Uuid) -> Option<&QuestionSubmission> {
        self.question_submissions
            .iter()
            .find(|qs| qs.question_id == question_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_status() -> JudgeStatus {
        JudgeStatus {
            id: 3,
            description: "Accepted".into(),
        }
    }

    #[test]
    fn classify_compares_output_on_executed_statuses() {
        assert_eq!(
            SubmissionResult::classify(&ok_status(), "42", "42"),
            SubmissionResult::Accepted
        );
        assert_eq!(
            SubmissionResult::classify(&ok_status(), "42", "41"),
            SubmissionResult::WrongAnswer
        );
    }

    #[test]
    fn classify_maps_judge_error_codes() {
        let mk = |id| JudgeStatus {
            id,
            description: String::new(),
        };
        assert_eq!(
            SubmissionResult::classify(&mk(5), "1", ""),
            SubmissionResult::TimeLimitExceeded
        );
        assert_eq!(
            SubmissionResult::classify(&mk(6), "1", ""),
            SubmissionResult::CompilationError
        );
        assert_eq!(
            SubmissionResult::classify(&mk(11), "1", ""),
            SubmissionResult::RuntimeError
        );
        assert_eq!(
            SubmissionResult::classify(&mk(13), "1", ""),
            SubmissionResult::InternalError
        );
    }

    #[test]
    fn result_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SubmissionResult::WrongAnswer).unwrap(),
            "\"wrong_answer\""
        );
    }
}
