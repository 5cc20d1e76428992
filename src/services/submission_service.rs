use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::submission::{
    QuestionSubmission, Submission, SubmissionResult, SubmissionStatus,
};
use crate::services::grading_service::{GradeSummary, GradingService};
use crate::services::judge_service::resolve_language_id;
use crate::services::statistics::StatisticsAggregator;
use crate::store::Store;

/// Roll-up view returned by the statistics endpoint and by final submit.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionStatistics {
    pub submission_id: Uuid,
    pub candidate_id: String,
    pub drive_id: Uuid,
    pub status: SubmissionStatus,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub total_questions: i32,
    pub problems_attempted: usize,
    pub questions_solved: i32,
    pub score_percentage: Decimal,
    pub total_time_taken: i64,
    pub question_breakdown: Vec<QuestionBreakdown>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionBreakdown {
    pub question_number: i32,
    pub question_id: Uuid,
    pub result: Option<SubmissionResult>,
    pub test_cases_passed: i32,
    pub total_test_cases: i32,
    pub time_taken: i64,
    pub execution_time_ms: i64,
    pub memory_used_mb: f64,
}

#[derive(Clone)]
pub struct SubmissionService {
    store: Arc<dyn Store>,
    grading: GradingService,
}

impl SubmissionService {
    pub fn new(store: Arc<dyn Store>, grading: GradingService) -> Self {
        Self { store, grading }
    }

    /// Lookup-or-create the single submission for `(candidate_id, drive_id)`.
    /// `total_questions` is snapshotted from the drive's current question
    /// list at creation and not refreshed afterwards. Returns the document
    /// and whether this call created it.
    pub async fn get_or_create(
        &self,
        candidate_id: &str,
        drive_id: Uuid,
    ) -> Result<(Submission, bool)> {
        if let Some(existing) = self.store.submission_for(candidate_id, drive_id).await? {
            return Ok((existing, false));
        }

        let drive = self
            .store
            .drive_by_id(drive_id)
            .await?
            .ok_or_else(|| Error::NotFound("Drive not found".to_string()))?;
        let total_questions = drive.coding_question_ids.len() as i32;
        if total_questions == 0 {
            return Err(Error::BadRequest(
                "No coding questions found for this drive".to_string(),
            ));
        }

        let submission = Submission::new(candidate_id.to_string(), drive_id, total_questions);
        let stored = self.store.insert_submission(&submission).await?;
        let created = stored.id == submission.id;
        if created {
            tracing::info!(
                submission_id = %stored.id,
                candidate_id = %candidate_id,
                drive_id = %drive_id,
                "submission created"
            );
        }
        Ok((stored, created))
    }

    /// Run one question: upsert the question entry (overwrite in place on
    /// re-submission, `question_number` preserved), then grade it against the
    /// question's test cases.
    pub async fn submit_question(
        &self,
        candidate_id: &str,
        drive_id: Uuid,
        question_id: Uuid,
        source_code: &str,
        language: &str,
        time_taken: i64,
    ) -> Result<GradeSummary> {
        let question = self
            .store
            .question_by_id(question_id)
            .await?
            .ok_or_else(|| Error::NotFound("Coding question not found".to_string()))?;
        if question.test_cases.is_empty() {
            return Err(Error::BadRequest(
                "No test cases found for this question".to_string(),
            ));
        }

        // Reject unknown languages before any entry is written or any judge
        // call is made.
        let language_id = resolve_language_id(language)?;

        let (submission, _) = self.get_or_create(candidate_id, drive_id).await?;

        let question_number = submission
            .question_submission(question_id)
            .map(|existing| existing.question_number)
            .unwrap_or(submission.question_submissions.len() as i32 + 1);

        let entry = QuestionSubmission::new(
            question_id,
            question_number,
            source_code.to_string(),
            language.to_string(),
            question.test_cases.len() as i32,
            time_taken,
            Utc::now(),
        );
        self.store
            .upsert_question_submission(submission.id, &entry)
            .await?;

        self.grading
            .grade_question(
                submission.id,
                question_id,
                source_code,
                language_id,
                &question.test_cases,
            )
            .await
    }

    /// Mark the assessment submitted. Partial submissions are legal; the
    /// current statistics are returned as-is.
    pub async fn final_submit(
        &self,
        candidate_id: &str,
        drive_id: Uuid,
    ) -> Result<SubmissionStatistics> {
        let (submission, _) = self.get_or_create(candidate_id, drive_id).await?;
        self.store.finalize_submission(submission.id).await?;
        self.get_statistics(submission.id).await
    }

    pub async fn get_submission(&self, submission_id: Uuid) -> Result<Submission> {
        self.store
            .submission_by_id(submission_id)
            .await?
            .ok_or_else(|| Error::NotFound("Submission not found".to_string()))
    }

    pub async fn submissions_by_candidate(&self, candidate_id: &str) -> Result<Vec<Submission>> {
        self.store.submissions_by_candidate(candidate_id).await
    }

    pub async fn submissions_by_drive(&self, drive_id: Uuid) -> Result<Vec<Submission>> {
        self.store.submissions_by_drive(drive_id).await
    }

    /// Roll-up plus per-question breakdown, derived purely from the current
    /// document.
    pub async fn get_statistics(&self, submission_id: Uuid) -> Result<SubmissionStatistics> {
        let submission = self.get_submission(submission_id).await?;
        let rollup = StatisticsAggregator::derive(&submission);

        let question_breakdown = submission
            .question_submissions
            .iter()
            .map(|qs| QuestionBreakdown {
                question_number: qs.question_number,
                question_id: qs.question_id,
                result: qs.result,
                test_cases_passed: qs.test_cases_passed,
                total_test_cases: qs.total_test_cases,
                time_taken: qs.time_taken,
                execution_time_ms: qs.execution_time_ms,
                memory_used_mb: qs.memory_used_mb,
            })
            .collect();

        Ok(SubmissionStatistics {
            submission_id: submission.id,
            candidate_id: submission.candidate_id,
            drive_id: submission.drive_id,
            status: submission.status,
            started_at: submission.started_at,
            submitted_at: submission.submitted_at,
            total_questions: submission.total_questions,
            problems_attempted: submission.question_submissions.len(),
            questions_solved: rollup.questions_solved,
            score_percentage: rollup.score_percentage,
            total_time_taken: rollup.total_time_taken,
            question_breakdown,
        })
    }
}
