//! Repository traits over the persistent documents. The store handle is
//! constructed once and injected into each service (`Arc<dyn Store>`); there
//! is no process-global connection. `PgStore` backs production, `MemoryStore`
//! backs tests.

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::coding_question::CodingQuestion;
use crate::models::drive::{Drive, DriveStatus, RoundStatus};
use crate::models::drive_candidate::{CandidateRoundState, Decision, DriveCandidate, RoundResult};
use crate::models::notification_job::NotificationJob;
use crate::models::submission::{QuestionSubmission, Submission, SubmissionStatus};

/// Field-scoped patch for one drive-level round state. `None` leaves the
/// field untouched.
#[derive(Debug, Clone, Default)]
pub struct RoundStatePatch {
    pub status: Option<RoundStatus>,
    pub scheduled: Option<bool>,
    pub completed: Option<bool>,
    pub deadline: Option<Option<DateTime<Utc>>>,
}

/// Field-scoped patch for one candidate-level round entry.
#[derive(Debug, Clone, Default)]
pub struct CandidateRoundPatch {
    pub status: Option<RoundStatus>,
    pub scheduled: Option<bool>,
    pub completed: Option<bool>,
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub result: Option<RoundResult>,
    pub score: Option<f64>,
    pub feedback: Option<String>,
    pub interview_link: Option<String>,
}

/// Grading outcome fields written onto one question submission.
#[derive(Debug, Clone)]
pub struct QuestionGradePatch {
    pub status: SubmissionStatus,
    pub result: crate::models::submission::SubmissionResult,
    pub test_cases_passed: i32,
    pub total_test_cases: i32,
    pub execution_time_ms: i64,
    pub memory_used_mb: f64,
    pub error_message: Option<String>,
    pub test_case_results: Vec<crate::models::submission::TestCaseResult>,
}

impl RoundStatePatch {
    pub fn apply(&self, rs: &mut crate::models::drive::RoundState, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            rs.status = status;
        }
        if let Some(scheduled) = self.scheduled {
            rs.scheduled = scheduled;
        }
        if let Some(completed) = self.completed {
            rs.completed = completed;
        }
        if let Some(deadline) = self.deadline {
            rs.deadline = deadline;
        }
        rs.updated_at = now;
    }
}

impl CandidateRoundPatch {
    pub fn apply(&self, entry: &mut CandidateRoundState, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            entry.status = status;
        }
        if let Some(scheduled) = self.scheduled {
            entry.scheduled = scheduled;
        }
        if let Some(completed) = self.completed {
            entry.completed = completed;
        }
        if let Some(deadline) = self.deadline {
            entry.deadline = deadline;
        }
        if let Some(result) = self.result {
            entry.result = result;
        }
        if let Some(score) = self.score {
            entry.score = Some(score);
        }
        if let Some(ref feedback) = self.feedback {
            entry.feedback = Some(feedback.clone());
        }
        if let Some(ref link) = self.interview_link {
            entry.interview_link = Some(link.clone());
        }
        entry.updated_at = now;
    }
}

impl QuestionGradePatch {
    pub fn apply(&self, qs: &mut QuestionSubmission, now: DateTime<Utc>) {
        qs.status = self.status;
        qs.result = Some(self.result);
        qs.test_cases_passed = self.test_cases_passed;
        qs.total_test_cases = self.total_test_cases;
        qs.execution_time_ms = self.execution_time_ms;
        qs.memory_used_mb = self.memory_used_mb;
        qs.error_message = self.error_message.clone();
        qs.test_case_results = self.test_case_results.clone();
        qs.updated_at = now;
    }
}

#[async_trait]
pub trait DriveRepo: Send + Sync {
    async fn insert_drive(&self, drive: &Drive) -> Result<()>;
    async fn drive_by_id(&self, id: Uuid) -> Result<Option<Drive>>;
    async fn drive_by_job(&self, job_id: &str) -> Result<Option<Drive>>;
    async fn list_drives(&self, company_id: Option<&str>) -> Result<Vec<Drive>>;

    /// Set `status`, the stage pointer and `updated_at` in one write.
    async fn set_drive_status(&self, id: Uuid, status: DriveStatus, current_stage: i32)
        -> Result<()>;
    async fn set_stage(&self, id: Uuid, current_stage: i32) -> Result<()>;

    /// Patch the round state matching `round_id`; optionally move
    /// `current_round` in the same write. Returns false when the drive has no
    /// such round.
    async fn patch_round_state(
        &self,
        drive_id: Uuid,
        round_id: Uuid,
        patch: &RoundStatePatch,
        current_round: Option<i32>,
    ) -> Result<bool>;

    /// Update the catalog entry's deadline (the tracking state is patched
    /// separately via [`DriveRepo::patch_round_state`]).
    async fn set_round_spec_deadline(
        &self,
        drive_id: Uuid,
        round_id: Uuid,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<bool>;
}

#[async_trait]
pub trait CandidateRepo: Send + Sync {
    async fn insert_candidate(&self, candidate: &DriveCandidate) -> Result<()>;
    async fn candidates_for_drive(&self, drive_id: Uuid) -> Result<Vec<DriveCandidate>>;
    async fn candidate(&self, drive_id: Uuid, candidate_id: &str)
        -> Result<Option<DriveCandidate>>;

    async fn set_shortlist(&self, id: Uuid, decision: Decision, score: Option<i32>) -> Result<()>;
    async fn set_selected(&self, id: Uuid, decision: Decision) -> Result<()>;

    /// Lazy initialization of the per-candidate round array (first
    /// shortlisting only).
    async fn set_rounds_status(&self, id: Uuid, rounds: &[CandidateRoundState]) -> Result<()>;

    /// Patch one candidate's round entry matching `round_id`; optionally move
    /// the candidate's `current_round`. Returns false when no entry matches
    /// (candidate not yet shortlisted, or older/shorter array).
    async fn patch_candidate_round(
        &self,
        id: Uuid,
        round_id: Uuid,
        patch: &CandidateRoundPatch,
        current_round: Option<i32>,
    ) -> Result<bool>;
}

#[async_trait]
pub trait QuestionRepo: Send + Sync {
    async fn insert_question(&self, question: &CodingQuestion) -> Result<()>;
    async fn question_by_id(&self, id: Uuid) -> Result<Option<CodingQuestion>>;
}

#[async_trait]
pub trait SubmissionRepo: Send + Sync {
    /// Insert unless a submission for the same `(candidate_id, drive_id)`
    /// already exists; either way return the stored document.
    async fn insert_submission(&self, submission: &Submission) -> Result<Submission>;
    async fn submission_by_id(&self, id: Uuid) -> Result<Option<Submission>>;
    async fn submission_for(
        &self,
        candidate_id: &str,
        drive_id: Uuid,
    ) -> Result<Option<Submission>>;
    async fn submissions_by_candidate(&self, candidate_id: &str) -> Result<Vec<Submission>>;
    async fn submissions_by_drive(&self, drive_id: Uuid) -> Result<Vec<Submission>>;

    /// Replace the entry with the same `question_id`, or append.
    async fn upsert_question_submission(
        &self,
        submission_id: Uuid,
        qs: &QuestionSubmission,
    ) -> Result<()>;
    async fn set_question_status(
        &self,
        submission_id: Uuid,
        question_id: Uuid,
        status: SubmissionStatus,
    ) -> Result<bool>;
    async fn apply_question_grade(
        &self,
        submission_id: Uuid,
        question_id: Uuid,
        grade: &QuestionGradePatch,
    ) -> Result<bool>;
    /// Record a grading-setup failure on the question entry.
    async fn mark_question_error(
        &self,
        submission_id: Uuid,
        question_id: Uuid,
        message: &str,
    ) -> Result<bool>;

    /// Roll-up fields only; never touches `status`.
    async fn set_submission_stats(
        &self,
        submission_id: Uuid,
        questions_solved: i32,
        score_percentage: rust_decimal::Decimal,
        total_time_taken: i64,
    ) -> Result<()>;
    async fn finalize_submission(&self, submission_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait OutboxRepo: Send + Sync {
    async fn enqueue_job(&self, job: &NotificationJob) -> Result<()>;
    /// Oldest pending job whose retry time has come.
    async fn claim_due_job(&self) -> Result<Option<NotificationJob>>;
    async fn record_delivery(
        &self,
        id: Uuid,
        http_status: Option<i32>,
        response_body: &str,
        success: bool,
    ) -> Result<()>;
    async fn schedule_retry(&self, id: Uuid, next_retry_at: DateTime<Utc>) -> Result<()>;
    async fn job_by_id(&self, id: Uuid) -> Result<Option<NotificationJob>>;
}

pub trait Store:
    DriveRepo + CandidateRepo + QuestionRepo + SubmissionRepo + OutboxRepo + Send + Sync
{
}

impl<T> Store for T where
    T: DriveRepo + CandidateRepo + QuestionRepo + SubmissionRepo + OutboxRepo + Send + Sync
{
}
