use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    CandidateRepo, CandidateRoundPatch, DriveRepo, OutboxRepo, QuestionGradePatch, QuestionRepo,
    RoundStatePatch, SubmissionRepo,
};
use crate::error::Result;
use crate::models::coding_question::CodingQuestion;
use crate::models::drive::{Drive, DriveStatus};
use crate::models::drive_candidate::{CandidateRoundState, Decision, DriveCandidate};
use crate::models::notification_job::{JobStatus, NotificationJob};
use crate::models::submission::{QuestionSubmission, Submission, SubmissionStatus};

#[derive(Debug, Default)]
struct Data {
    drives: HashMap<Uuid, Drive>,
    candidates: Vec<DriveCandidate>,
    questions: HashMap<Uuid, CodingQuestion>,
    submissions: Vec<Submission>,
    jobs: Vec<NotificationJob>,
}

/// In-memory store, mirroring the document semantics of the Postgres
/// implementation. Used as the test double behind `Arc<dyn Store>`.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<Data>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: number of notification jobs recorded for an event type.
    pub fn jobs_with_event(&self, event_type: &str) -> usize {
        let data = self.data.lock().unwrap();
        data.jobs
            .iter()
            .filter(|j| j.event_type == event_type)
            .count()
    }
}

#[async_trait]
impl DriveRepo for MemoryStore {
    async fn insert_drive(&self, drive: &Drive) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        data.drives.insert(drive.id, drive.clone());
        Ok(())
    }

    async fn drive_by_id(&self, id: Uuid) -> Result<Option<Drive>> {
        let data = self.data.lock().unwrap();
        Ok(data.drives.get(&id).cloned())
    }

    async fn drive_by_job(&self, job_id: &str) -> Result<Option<Drive>> {
        let data = self.data.lock().unwrap();
        Ok(data.drives.values().find(|d| d.job_id == job_id).cloned())
    }

    async fn list_drives(&self, company_id: Option<&str>) -> Result<Vec<Drive>> {
        let data = self.data.lock().unwrap();
        let mut drives: Vec<Drive> = data
            .drives
            .values()
            .filter(|d| company_id.map_or(true, |c| d.company_id == c))
            .cloned()
            .collect();
        drives.sort_by_key(|d| d.created_at);
        Ok(drives)
    }

    async fn set_drive_status(
        &self,
        id: Uuid,
        status: DriveStatus,
        current_stage: i32,
    ) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        if let Some(drive) = data.drives.get_mut(&id) {
            drive.status = status;
            drive.current_stage = current_stage;
            drive.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_stage(&self, id: Uuid, current_stage: i32) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        if let Some(drive) = data.drives.get_mut(&id) {
            drive.current_stage = current_stage;
            drive.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn patch_round_state(
        &self,
        drive_id: Uuid,
        round_id: Uuid,
        patch: &RoundStatePatch,
        current_round: Option<i32>,
    ) -> Result<bool> {
        let mut data = self.data.lock().unwrap();
        let Some(drive) = data.drives.get_mut(&drive_id) else {
            return Ok(false);
        };
        let now = Utc::now();
        let Some(rs) = drive
            .round_statuses
            .iter_mut()
            .find(|rs| rs.round_id == round_id)
        else {
            return Ok(false);
        };
        patch.apply(rs, now);
        if let Some(round) = current_round {
            drive.current_round = round;
        }
        drive.updated_at = now;
        Ok(true)
    }

    async fn set_round_spec_deadline(
        &self,
        drive_id: Uuid,
        round_id: Uuid,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let mut data = self.data.lock().unwrap();
        let Some(drive) = data.drives.get_mut(&drive_id) else {
            return Ok(false);
        };
        let Some(spec) = drive.rounds.iter_mut().find(|r| r.round_id == round_id) else {
            return Ok(false);
        };
        spec.deadline = deadline;
        drive.updated_at = Utc::now();
        Ok(true)
    }
}

#[async_trait]
impl CandidateRepo for MemoryStore {
    async fn insert_candidate(&self, candidate: &DriveCandidate) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        data.candidates.push(candidate.clone());
        Ok(())
    }

    async fn candidates_for_drive(&self, drive_id: Uuid) -> Result<Vec<DriveCandidate>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .candidates
            .iter()
            .filter(|c| c.drive_id == drive_id)
            .cloned()
            .collect())
    }

    async fn candidate(
        &self,
        drive_id: Uuid,
        candidate_id: &str,
    ) -> Result<Option<DriveCandidate>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .candidates
            .iter()
            .find(|c| c.drive_id == drive_id && c.candidate_id == candidate_id)
            .cloned())
    }

    async fn set_shortlist(&self, id: Uuid, decision: Decision, score: Option<i32>) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        if let Some(c) = data.candidates.iter_mut().find(|c| c.id == id) {
            c.resume_shortlisted = decision;
            c.resume_score = score;
            c.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_selected(&self, id: Uuid, decision: Decision) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        if let Some(c) = data.candidates.iter_mut().find(|c| c.id == id) {
            c.selected = decision;
            c.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_rounds_status(&self, id: Uuid, rounds: &[CandidateRoundState]) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        if let Some(c) = data.candidates.iter_mut().find(|c| c.id == id) {
            c.rounds_status = rounds.to_vec();
            c.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn patch_candidate_round(
        &self,
        id: Uuid,
        round_id: Uuid,
        patch: &CandidateRoundPatch,
        current_round: Option<i32>,
    ) -> Result<bool> {
        let mut data = self.data.lock().unwrap();
        let Some(c) = data.candidates.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };
        let now = Utc::now();
        let Some(entry) = c
            .rounds_status
            .iter_mut()
            .find(|rs| rs.round_id == round_id)
        else {
            return Ok(false);
        };
        patch.apply(entry, now);
        if let Some(round) = current_round {
            c.current_round = round;
        }
        c.updated_at = now;
        Ok(true)
    }
}

#[async_trait]
impl QuestionRepo for MemoryStore {
    async fn insert_question(&self, question: &CodingQuestion) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        data.questions.insert(question.id, question.clone());
        Ok(())
    }

    async fn question_by_id(&self, id: Uuid) -> Result<Option<CodingQuestion>> {
        let data = self.data.lock().unwrap();
        Ok(data.questions.get(&id).cloned())
    }
}

#[async_trait]
impl SubmissionRepo for MemoryStore {
    async fn insert_submission(&self, submission: &Submission) -> Result<Submission> {
        let mut data = self.data.lock().unwrap();
        if let Some(existing) = data
            .submissions
            .iter()
            .find(|s| s.candidate_id == submission.candidate_id && s.drive_id == submission.drive_id)
        {
            return Ok(existing.clone());
        }
        data.submissions.push(submission.clone());
        Ok(submission.clone())
    }

    async fn submission_by_id(&self, id: Uuid) -> Result<Option<Submission>> {
        let data = self.data.lock().unwrap();
        Ok(data.submissions.iter().find(|s| s.id == id).cloned())
    }

    async fn submission_for(
        &self,
        candidate_id: &str,
        drive_id: Uuid,
    ) -> Result<Option<Submission>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .submissions
            .iter()
            .find(|s| s.candidate_id == candidate_id && s.drive_id == drive_id)
            .cloned())
    }

    async fn submissions_by_candidate(&self, candidate_id: &str) -> Result<Vec<Submission>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .submissions
            .iter()
            .filter(|s| s.candidate_id == candidate_id)
            .cloned()
            .collect())
    }

    async fn submissions_by_drive(&self, drive_id: Uuid) -> Result<Vec<Submission>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .submissions
            .iter()
            .filter(|s| s.drive_id == drive_id)
            .cloned()
            .collect())
    }

    async fn upsert_question_submission(
        &self,
        submission_id: Uuid,
        qs: &QuestionSubmission,
    ) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        if let Some(s) = data.submissions.iter_mut().find(|s| s.id == submission_id) {
            match s
                .question_submissions
                .iter_mut()
                .find(|existing| existing.question_id == qs.question_id)
            {
                Some(existing) => *existing = qs.clone(),
                None => s.question_submissions.push(qs.clone()),
            }
            s.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_question_status(
        &self,
        submission_id: Uuid,
        question_id: Uuid,
        status: SubmissionStatus,
    ) -> Result<bool> {
        let mut data = self.data.lock().unwrap();
        let Some(s) = data.submissions.iter_mut().find(|s| s.id == submission_id) else {
            return Ok(false);
        };
        let Some(qs) = s
            .question_submissions
            .iter_mut()
            .find(|qs| qs.question_id == question_id)
        else {
            return Ok(false);
        };
        qs.status = status;
        qs.updated_at = Utc::now();
        Ok(true)
    }

    async fn apply_question_grade(
        &self,
        submission_id: Uuid,
        question_id: Uuid,
        grade: &QuestionGradePatch,
    ) -> Result<bool> {
        let mut data = self.data.lock().unwrap();
        let Some(s) = data.submissions.iter_mut().find(|s| s.id == submission_id) else {
            return Ok(false);
        };
        let now = Utc::now();
        let Some(qs) = s
            .question_submissions
            .iter_mut()
            .find(|qs| qs.question_id == question_id)
        else {
            return Ok(false);
        };
        grade.apply(qs, now);
        s.updated_at = now;
        Ok(true)
    }

    async fn mark_question_error(
        &self,
        submission_id: Uuid,
        question_id: Uuid,
        message: &str,
    ) -> Result<bool> {
        let mut data = self.data.lock().unwrap();
        let Some(s) = data.submissions.iter_mut().find(|s| s.id == submission_id) else {
            return Ok(false);
        };
        let now = Utc::now();
        let Some(qs) = s
            .question_submissions
            .iter_mut()
            .find(|qs| qs.question_id == question_id)
        else {
            return Ok(false);
        };
        qs.status = SubmissionStatus::Error;
        qs.result = Some(crate::models::submission::SubmissionResult::Error);
        qs.error_message = Some(message.to_string());
        qs.updated_at = now;
        s.updated_at = now;
        Ok(true)
    }

    async fn set_submission_stats(
        &self,
        submission_id: Uuid,
        questions_solved: i32,
        score_percentage: rust_decimal::Decimal,
        total_time_taken: i64,
    ) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        if let Some(s) = data.submissions.iter_mut().find(|s| s.id == submission_id) {
            s.questions_solved = questions_solved;
            s.score_percentage = score_percentage;
            s.total_time_taken = total_time_taken;
            s.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn finalize_submission(&self, submission_id: Uuid) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        if let Some(s) = data.submissions.iter_mut().find(|s| s.id == submission_id) {
            let now = Utc::now();
            s.status = SubmissionStatus::Completed;
            s.submitted_at = Some(now);
            s.updated_at = now;
        }
        Ok(())
    }
}

#[async_trait]
impl OutboxRepo for MemoryStore {
    async fn enqueue_job(&self, job: &NotificationJob) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        data.jobs.push(job.clone());
        Ok(())
    }

    async fn claim_due_job(&self) -> Result<Option<NotificationJob>> {
        let data = self.data.lock().unwrap();
        let now = Utc::now();
        Ok(data
            .jobs
            .iter()
            .filter(|j| {
                j.status == JobStatus::Pending
                    && j.next_retry_at.map_or(true, |at| at <= now)
            })
            .min_by_key(|j| j.created_at)
            .cloned())
    }

    async fn record_delivery(
        &self,
        id: Uuid,
        http_status: Option<i32>,
        response_body: &str,
        success: bool,
    ) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        if let Some(job) = data.jobs.iter_mut().find(|j| j.id == id) {
            job.http_status = http_status;
            job.response_body = Some(response_body.to_string());
            job.attempts += 1;
            job.status = if success {
                JobStatus::Success
            } else {
                JobStatus::Failed
            };
            job.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn schedule_retry(&self, id: Uuid, next_retry_at: DateTime<Utc>) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        if let Some(job) = data.jobs.iter_mut().find(|j| j.id == id) {
            job.status = JobStatus::Pending;
            job.next_retry_at = Some(next_retry_at);
            job.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn job_by_id(&self, id: Uuid) -> Result<Option<NotificationJob>> {
        let data = self.data.lock().unwrap();
        Ok(data.jobs.iter().find(|j| j.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::drive::{generate_round_statuses, RoundSpec, RoundStatus};
    use crate::models::drive_candidate::CandidateRoundState;
    use tokio_test::block_on;

    fn seeded_candidate(with_rounds: bool) -> (MemoryStore, DriveCandidate, Uuid) {
        let store = MemoryStore::new();
        let round_id = Uuid::new_v4();
        let rounds = vec![RoundSpec {
            round_id,
            round_type: "HR".into(),
            description: None,
            deadline: None,
        }];
        let now = Utc::now();
        let statuses = generate_round_statuses(&rounds, now);
        let candidate = DriveCandidate {
            id: Uuid::new_v4(),
            drive_id: Uuid::new_v4(),
            candidate_id: "cand-1".into(),
            name: None,
            email: None,
            resume_content: None,
            resume_score: None,
            resume_shortlisted: Decision::Unset,
            selected: Decision::Unset,
            current_round: 0,
            rounds_status: if with_rounds {
                statuses
                    .iter()
                    .map(|rs| CandidateRoundState::from_round(rs, now))
                    .collect()
            } else {
                Vec::new()
            },
            created_at: now,
            updated_at: now,
        };
        block_on(store.insert_candidate(&candidate)).unwrap();
        (store, candidate, round_id)
    }

    #[test]
    fn patch_matches_round_by_stable_id() {
        let (store, candidate, round_id) = seeded_candidate(true);
        let patch = super::CandidateRoundPatch {
            status: Some(RoundStatus::InProgress),
            scheduled: Some(true),
            ..Default::default()
        };
        assert!(block_on(store.patch_candidate_round(candidate.id, round_id, &patch, None)).unwrap());

        let stored = block_on(store.candidate(candidate.drive_id, "cand-1"))
            .unwrap()
            .unwrap();
        assert_eq!(stored.rounds_status[0].status, RoundStatus::InProgress);
        assert!(stored.rounds_status[0].scheduled);
    }

    #[test]
    fn patch_reports_missing_entry_instead_of_failing() {
        let (store, candidate, round_id) = seeded_candidate(false);
        let patch = super::CandidateRoundPatch {
            completed: Some(true),
            ..Default::default()
        };
        assert!(!block_on(store.patch_candidate_round(candidate.id, round_id, &patch, None)).unwrap());
    }

    #[test]
    fn duplicate_submission_insert_returns_existing() {
        let store = MemoryStore::new();
        let drive_id = Uuid::new_v4();
        let first = Submission::new("cand-1".into(), drive_id, 2);
        let second = Submission::new("cand-1".into(), drive_id, 2);

        let stored_first = block_on(store.insert_submission(&first)).unwrap();
        let stored_second = block_on(store.insert_submission(&second)).unwrap();
        assert_eq!(stored_first.id, stored_second.id);
    }
}
