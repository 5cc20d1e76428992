use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{
    CandidateRepo, CandidateRoundPatch, DriveRepo, OutboxRepo, QuestionGradePatch, QuestionRepo,
    RoundStatePatch, SubmissionRepo,
};
use crate::error::{Error, Result};
use crate::models::coding_question::CodingQuestion;
use crate::models::drive::{Drive, DriveStatus, JobType, RoundSpec, RoundState};
use crate::models::drive_candidate::{CandidateRoundState, Decision, DriveCandidate};
use crate::models::notification_job::{JobStatus, NotificationJob};
use crate::models::submission::{QuestionSubmission, Submission, SubmissionStatus};

/// Postgres store. Scalar fields live in columns; the array-valued document
/// fields are JSONB, updated read-modify-write at document granularity.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn json_column<T: DeserializeOwned>(row: &PgRow, name: &str) -> Result<T> {
    let value: JsonValue = row.try_get(name).map_err(Error::Database)?;
    Ok(serde_json::from_value(value)?)
}

fn to_json<T: Serialize>(value: &T) -> Result<JsonValue> {
    Ok(serde_json::to_value(value)?)
}

fn parse_status(raw: &str) -> Result<DriveStatus> {
    DriveStatus::from_str(raw)
        .ok_or_else(|| Error::Internal(format!("unknown drive status in store: {raw}")))
}

fn row_to_drive(row: &PgRow) -> Result<Drive> {
    let status: String = row.try_get("status").map_err(Error::Database)?;
    let job_type: String = row.try_get("job_type").map_err(Error::Database)?;
    Ok(Drive {
        id: row.try_get("id").map_err(Error::Database)?,
        company_id: row.try_get("company_id").map_err(Error::Database)?,
        job_id: row.try_get("job_id").map_err(Error::Database)?,
        role: row.try_get("role").map_err(Error::Database)?,
        location: row.try_get("location").map_err(Error::Database)?,
        candidates_to_hire: row.try_get("candidates_to_hire").map_err(Error::Database)?,
        job_type: if job_type == "internship" {
            JobType::Internship
        } else {
            JobType::FullTime
        },
        internship_duration: row.try_get("internship_duration").map_err(Error::Database)?,
        skills: json_column(row, "skills")?,
        rounds: json_column::<Vec<RoundSpec>>(row, "rounds")?,
        round_statuses: json_column::<Vec<RoundState>>(row, "round_statuses")?,
        current_round: row.try_get("current_round").map_err(Error::Database)?,
        status: parse_status(&status)?,
        stages: json_column(row, "stages")?,
        current_stage: row.try_get("current_stage").map_err(Error::Database)?,
        coding_question_ids: json_column(row, "coding_question_ids")?,
        created_at: row.try_get("created_at").map_err(Error::Database)?,
        updated_at: row.try_get("updated_at").map_err(Error::Database)?,
    })
}

fn decision_str(decision: Decision) -> &'static str {
    match decision {
        Decision::Yes => "yes",
        Decision::No => "no",
        Decision::Unset => "unset",
    }
}

fn parse_decision(raw: &str) -> Decision {
    match raw {
        "yes" => Decision::Yes,
        "no" => Decision::No,
        _ => Decision::Unset,
    }
}

fn row_to_candidate(row: &PgRow) -> Result<DriveCandidate> {
    let shortlisted: String = row.try_get("resume_shortlisted").map_err(Error::Database)?;
    let selected: String = row.try_get("selected").map_err(Error::Database)?;
    Ok(DriveCandidate {
        id: row.try_get("id").map_err(Error::Database)?,
        drive_id: row.try_get("drive_id").map_err(Error::Database)?,
        candidate_id: row.try_get("candidate_id").map_err(Error::Database)?,
        name: row.try_get("name").map_err(Error::Database)?,
        email: row.try_get("email").map_err(Error::Database)?,
        resume_content: row.try_get("resume_content").map_err(Error::Database)?,
        resume_score: row.try_get("resume_score").map_err(Error::Database)?,
        resume_shortlisted: parse_decision(&shortlisted),
        selected: parse_decision(&selected),
        current_round: row.try_get("current_round").map_err(Error::Database)?,
        rounds_status: json_column::<Vec<CandidateRoundState>>(row, "rounds_status")?,
        created_at: row.try_get("created_at").map_err(Error::Database)?,
        updated_at: row.try_get("updated_at").map_err(Error::Database)?,
    })
}

fn submission_status_str(status: SubmissionStatus) -> &'static str {
    match status {
        SubmissionStatus::Pending => "pending",
        SubmissionStatus::Running => "running",
        SubmissionStatus::Completed => "completed",
        SubmissionStatus::Error => "error",
    }
}

fn parse_submission_status(raw: &str) -> SubmissionStatus {
    match raw {
        "running" => SubmissionStatus::Running,
        "completed" => SubmissionStatus::Completed,
        "error" => SubmissionStatus::Error,
        _ => SubmissionStatus::Pending,
    }
}

fn row_to_submission(row: &PgRow) -> Result<Submission> {
    let status: String = row.try_get("status").map_err(Error::Database)?;
    Ok(Submission {
        id: row.try_get("id").map_err(Error::Database)?,
        candidate_id: row.try_get("candidate_id").map_err(Error::Database)?,
        drive_id: row.try_get("drive_id").map_err(Error::Database)?,
        total_questions: row.try_get("total_questions").map_err(Error::Database)?,
        question_submissions: json_column::<Vec<QuestionSubmission>>(row, "question_submissions")?,
        questions_solved: row.try_get("questions_solved").map_err(Error::Database)?,
        score_percentage: row
            .try_get::<Decimal, _>("score_percentage")
            .map_err(Error::Database)?,
        total_time_taken: row.try_get("total_time_taken").map_err(Error::Database)?,
        status: parse_submission_status(&status),
        started_at: row.try_get("started_at").map_err(Error::Database)?,
        submitted_at: row.try_get("submitted_at").map_err(Error::Database)?,
        created_at: row.try_get("created_at").map_err(Error::Database)?,
        updated_at: row.try_get("updated_at").map_err(Error::Database)?,
    })
}

fn row_to_question(row: &PgRow) -> Result<CodingQuestion> {
    Ok(CodingQuestion {
        id: row.try_get("id").map_err(Error::Database)?,
        company_id: row.try_get("company_id").map_err(Error::Database)?,
        title: row.try_get("title").map_err(Error::Database)?,
        description: row.try_get("description").map_err(Error::Database)?,
        constraints: row.try_get("constraints").map_err(Error::Database)?,
        difficulty: row.try_get("difficulty").map_err(Error::Database)?,
        tags: json_column(row, "tags")?,
        time_limit: row.try_get("time_limit").map_err(Error::Database)?,
        memory_limit: row.try_get("memory_limit").map_err(Error::Database)?,
        test_cases: json_column(row, "test_cases")?,
        created_at: row.try_get("created_at").map_err(Error::Database)?,
        updated_at: row.try_get("updated_at").map_err(Error::Database)?,
    })
}

fn row_to_job(row: &PgRow) -> Result<NotificationJob> {
    let status: String = row.try_get("status").map_err(Error::Database)?;
    Ok(NotificationJob {
        id: row.try_get("id").map_err(Error::Database)?,
        event_type: row.try_get("event_type").map_err(Error::Database)?,
        payload: row.try_get("payload").map_err(Error::Database)?,
        target_url: row.try_get("target_url").map_err(Error::Database)?,
        status: match status.as_str() {
            "success" => JobStatus::Success,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Pending,
        },
        attempts: row.try_get("attempts").map_err(Error::Database)?,
        max_attempts: row.try_get("max_attempts").map_err(Error::Database)?,
        next_retry_at: row.try_get("next_retry_at").map_err(Error::Database)?,
        http_status: row.try_get("http_status").map_err(Error::Database)?,
        response_body: row.try_get("response_body").map_err(Error::Database)?,
        created_at: row.try_get("created_at").map_err(Error::Database)?,
        updated_at: row.try_get("updated_at").map_err(Error::Database)?,
    })
}

#[async_trait]
impl DriveRepo for PgStore {
    async fn insert_drive(&self, drive: &Drive) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO drives (
                id, company_id, job_id, role, location, candidates_to_hire, job_type,
                internship_duration, skills, rounds, round_statuses, current_round,
                status, stages, current_stage, coding_question_ids, created_at, updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18)
            "#,
        )
        .bind(drive.id)
        .bind(&drive.company_id)
        .bind(&drive.job_id)
        .bind(&drive.role)
        .bind(&drive.location)
        .bind(drive.candidates_to_hire)
        .bind(match drive.job_type {
            JobType::FullTime => "full-time",
            JobType::Internship => "internship",
        })
        .bind(&drive.internship_duration)
        .bind(to_json(&drive.skills)?)
        .bind(to_json(&drive.rounds)?)
        .bind(to_json(&drive.round_statuses)?)
        .bind(drive.current_round)
        .bind(drive.status.as_str())
        .bind(to_json(&drive.stages)?)
        .bind(drive.current_stage)
        .bind(to_json(&drive.coding_question_ids)?)
        .bind(drive.created_at)
        .bind(drive.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn drive_by_id(&self, id: Uuid) -> Result<Option<Drive>> {
        let row = sqlx::query(r#"SELECT * FROM drives WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_drive).transpose()
    }

    async fn drive_by_job(&self, job_id: &str) -> Result<Option<Drive>> {
        let row = sqlx::query(r#"SELECT * FROM drives WHERE job_id = $1"#)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_drive).transpose()
    }

    async fn list_drives(&self, company_id: Option<&str>) -> Result<Vec<Drive>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM drives
            WHERE ($1::text IS NULL OR company_id = $1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_drive).collect()
    }

    async fn set_drive_status(
        &self,
        id: Uuid,
        status: DriveStatus,
        current_stage: i32,
    ) -> Result<()> {
        sqlx::query(
            r#"UPDATE drives SET status = $1, current_stage = $2, updated_at = NOW() WHERE id = $3"#,
        )
        .bind(status.as_str())
        .bind(current_stage)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_stage(&self, id: Uuid, current_stage: i32) -> Result<()> {
        sqlx::query(r#"UPDATE drives SET current_stage = $1, updated_at = NOW() WHERE id = $2"#)
            .bind(current_stage)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn patch_round_state(
        &self,
        drive_id: Uuid,
        round_id: Uuid,
        patch: &RoundStatePatch,
        current_round: Option<i32>,
    ) -> Result<bool> {
        let row = sqlx::query(r#"SELECT round_statuses FROM drives WHERE id = $1"#)
            .bind(drive_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else { return Ok(false) };
        let mut statuses: Vec<RoundState> = json_column(&row, "round_statuses")?;
        let now = Utc::now();
        let Some(rs) = statuses.iter_mut().find(|rs| rs.round_id == round_id) else {
            return Ok(false);
        };
        patch.apply(rs, now);

        sqlx::query(
            r#"
            UPDATE drives
            SET round_statuses = $1,
                current_round = COALESCE($2, current_round),
                updated_at = $3
            WHERE id = $4
            "#,
        )
        .bind(to_json(&statuses)?)
        .bind(current_round)
        .bind(now)
        .bind(drive_id)
        .execute(&self.pool)
        .await?;
        Ok(true)
    }

    async fn set_round_spec_deadline(
        &self,
        drive_id: Uuid,
        round_id: Uuid,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let row = sqlx::query(r#"SELECT rounds FROM drives WHERE id = $1"#)
            .bind(drive_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else { return Ok(false) };
        let mut rounds: Vec<RoundSpec> = json_column(&row, "rounds")?;
        let Some(spec) = rounds.iter_mut().find(|r| r.round_id == round_id) else {
            return Ok(false);
        };
        spec.deadline = deadline;

        sqlx::query(r#"UPDATE drives SET rounds = $1, updated_at = NOW() WHERE id = $2"#)
            .bind(to_json(&rounds)?)
            .bind(drive_id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }
}

#[async_trait]
impl CandidateRepo for PgStore {
    async fn insert_candidate(&self, candidate: &DriveCandidate) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO drive_candidates (
                id, drive_id, candidate_id, name, email, resume_content, resume_score,
                resume_shortlisted, selected, current_round, rounds_status, created_at, updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
            "#,
        )
        .bind(candidate.id)
        .bind(candidate.drive_id)
        .bind(&candidate.candidate_id)
        .bind(&candidate.name)
        .bind(&candidate.email)
        .bind(&candidate.resume_content)
        .bind(candidate.resume_score)
        .bind(decision_str(candidate.resume_shortlisted))
        .bind(decision_str(candidate.selected))
        .bind(candidate.current_round)
        .bind(to_json(&candidate.rounds_status)?)
        .bind(candidate.created_at)
        .bind(candidate.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn candidates_for_drive(&self, drive_id: Uuid) -> Result<Vec<DriveCandidate>> {
        let rows = sqlx::query(
            r#"SELECT * FROM drive_candidates WHERE drive_id = $1 ORDER BY created_at ASC"#,
        )
        .bind(drive_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_candidate).collect()
    }

    async fn candidate(
        &self,
        drive_id: Uuid,
        candidate_id: &str,
    ) -> Result<Option<DriveCandidate>> {
        let row = sqlx::query(
            r#"SELECT * FROM drive_candidates WHERE drive_id = $1 AND candidate_id = $2"#,
        )
        .bind(drive_id)
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_candidate).transpose()
    }

    async fn set_shortlist(&self, id: Uuid, decision: Decision, score: Option<i32>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE drive_candidates
            SET resume_shortlisted = $1, resume_score = $2, updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(decision_str(decision))
        .bind(score)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_selected(&self, id: Uuid, decision: Decision) -> Result<()> {
        sqlx::query(
            r#"UPDATE drive_candidates SET selected = $1, updated_at = NOW() WHERE id = $2"#,
        )
        .bind(decision_str(decision))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_rounds_status(&self, id: Uuid, rounds: &[CandidateRoundState]) -> Result<()> {
        sqlx::query(
            r#"UPDATE drive_candidates SET rounds_status = $1, updated_at = NOW() WHERE id = $2"#,
        )
        .bind(to_json(&rounds)?)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn patch_candidate_round(
        &self,
        id: Uuid,
        round_id: Uuid,
        patch: &CandidateRoundPatch,
        current_round: Option<i32>,
    ) -> Result<bool> {
        let row = sqlx::query(r#"SELECT rounds_status FROM drive_candidates WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else { return Ok(false) };
        let mut rounds: Vec<CandidateRoundState> = json_column(&row, "rounds_status")?;
        let now = Utc::now();
        let Some(entry) = rounds.iter_mut().find(|rs| rs.round_id == round_id) else {
            return Ok(false);
        };
        patch.apply(entry, now);

        sqlx::query(
            r#"
            UPDATE drive_candidates
            SET rounds_status = $1,
                current_round = COALESCE($2, current_round),
                updated_at = $3
            WHERE id = $4
            "#,
        )
        .bind(to_json(&rounds)?)
        .bind(current_round)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(true)
    }
}

#[async_trait]
impl QuestionRepo for PgStore {
    async fn insert_question(&self, question: &CodingQuestion) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO coding_questions (
                id, company_id, title, description, constraints, difficulty, tags,
                time_limit, memory_limit, test_cases, created_at, updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
            "#,
        )
        .bind(question.id)
        .bind(&question.company_id)
        .bind(&question.title)
        .bind(&question.description)
        .bind(&question.constraints)
        .bind(&question.difficulty)
        .bind(to_json(&question.tags)?)
        .bind(question.time_limit)
        .bind(question.memory_limit)
        .bind(to_json(&question.test_cases)?)
        .bind(question.created_at)
        .bind(question.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn question_by_id(&self, id: Uuid) -> Result<Option<CodingQuestion>> {
        let row = sqlx::query(r#"SELECT * FROM coding_questions WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_question).transpose()
    }
}

#[async_trait]
impl SubmissionRepo for PgStore {
    async fn insert_submission(&self, submission: &Submission) -> Result<Submission> {
        sqlx::query(
            r#"
            INSERT INTO submissions (
                id, candidate_id, drive_id, total_questions, question_submissions,
                questions_solved, score_percentage, total_time_taken, status,
                started_at, submitted_at, created_at, updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
            ON CONFLICT (candidate_id, drive_id) DO NOTHING
            "#,
        )
        .bind(submission.id)
        .bind(&submission.candidate_id)
        .bind(submission.drive_id)
        .bind(submission.total_questions)
        .bind(to_json(&submission.question_submissions)?)
        .bind(submission.questions_solved)
        .bind(submission.score_percentage)
        .bind(submission.total_time_taken)
        .bind(submission_status_str(submission.status))
        .bind(submission.started_at)
        .bind(submission.submitted_at)
        .bind(submission.created_at)
        .bind(submission.updated_at)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            r#"SELECT * FROM submissions WHERE candidate_id = $1 AND drive_id = $2"#,
        )
        .bind(&submission.candidate_id)
        .bind(submission.drive_id)
        .fetch_one(&self.pool)
        .await?;
        row_to_submission(&row)
    }

    async fn submission_by_id(&self, id: Uuid) -> Result<Option<Submission>> {
        let row = sqlx::query(r#"SELECT * FROM submissions WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_submission).transpose()
    }

    async fn submission_for(
        &self,
        candidate_id: &str,
        drive_id: Uuid,
    ) -> Result<Option<Submission>> {
        let row = sqlx::query(
            r#"SELECT * FROM submissions WHERE candidate_id = $1 AND drive_id = $2"#,
        )
        .bind(candidate_id)
        .bind(drive_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_submission).transpose()
    }

    async fn submissions_by_candidate(&self, candidate_id: &str) -> Result<Vec<Submission>> {
        let rows = sqlx::query(
            r#"SELECT * FROM submissions WHERE candidate_id = $1 ORDER BY created_at ASC"#,
        )
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_submission).collect()
    }

    async fn submissions_by_drive(&self, drive_id: Uuid) -> Result<Vec<Submission>> {
        let rows = sqlx::query(
            r#"SELECT * FROM submissions WHERE drive_id = $1 ORDER BY created_at ASC"#,
        )
        .bind(drive_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_submission).collect()
    }

    async fn upsert_question_submission(
        &self,
        submission_id: Uuid,
        qs: &QuestionSubmission,
    ) -> Result<()> {
        self.modify_question_submissions(submission_id, |entries| {
            match entries
                .iter_mut()
                .find(|existing| existing.question_id == qs.question_id)
            {
                Some(existing) => *existing = qs.clone(),
                None => entries.push(qs.clone()),
            }
            true
        })
        .await?;
        Ok(())
    }

    async fn set_question_status(
        &self,
        submission_id: Uuid,
        question_id: Uuid,
        status: SubmissionStatus,
    ) -> Result<bool> {
        let now = Utc::now();
        self.modify_question_submissions(submission_id, |entries| {
            match entries.iter_mut().find(|qs| qs.question_id == question_id) {
                Some(qs) => {
                    qs.status = status;
                    qs.updated_at = now;
                    true
                }
                None => false,
            }
        })
        .await
    }

    async fn apply_question_grade(
        &self,
        submission_id: Uuid,
        question_id: Uuid,
        grade: &QuestionGradePatch,
    ) -> Result<bool> {
        let now = Utc::now();
        self.modify_question_submissions(submission_id, |entries| {
            match entries.iter_mut().find(|qs| qs.question_id == question_id) {
                Some(qs) => {
                    grade.apply(qs, now);
                    true
                }
                None => false,
            }
        })
        .await
    }

    async fn mark_question_error(
        &self,
        submission_id: Uuid,
        question_id: Uuid,
        message: &str,
    ) -> Result<bool> {
        let now = Utc::now();
        self.modify_question_submissions(submission_id, |entries| {
            match entries.iter_mut().find(|qs| qs.question_id == question_id) {
                Some(qs) => {
                    qs.status = SubmissionStatus::Error;
                    qs.result = Some(crate::models::submission::SubmissionResult::Error);
                    qs.error_message = Some(message.to_string());
                    qs.updated_at = now;
                    true
                }
                None => false,
            }
        })
        .await
    }

    async fn set_submission_stats(
        &self,
        submission_id: Uuid,
        questions_solved: i32,
        score_percentage: Decimal,
        total_time_taken: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE submissions
            SET questions_solved = $1, score_percentage = $2, total_time_taken = $3,
                updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(questions_solved)
        .bind(score_percentage)
        .bind(total_time_taken)
        .bind(submission_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn finalize_submission(&self, submission_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE submissions
            SET status = 'completed', submitted_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(submission_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl PgStore {
    /// Shared read-modify-write cycle over the `question_submissions`
    /// document array. The closure returns whether anything changed; the
    /// write is skipped otherwise.
    async fn modify_question_submissions<F>(&self, submission_id: Uuid, mutate: F) -> Result<bool>
    where
        F: FnOnce(&mut Vec<QuestionSubmission>) -> bool,
    {
        let row = sqlx::query(r#"SELECT question_submissions FROM submissions WHERE id = $1"#)
            .bind(submission_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else { return Ok(false) };
        let mut entries: Vec<QuestionSubmission> = json_column(&row, "question_submissions")?;
        if !mutate(&mut entries) {
            return Ok(false);
        }

        sqlx::query(
            r#"UPDATE submissions SET question_submissions = $1, updated_at = NOW() WHERE id = $2"#,
        )
        .bind(to_json(&entries)?)
        .bind(submission_id)
        .execute(&self.pool)
        .await?;
        Ok(true)
    }
}

#[async_trait]
impl OutboxRepo for PgStore {
    async fn enqueue_job(&self, job: &NotificationJob) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notification_jobs (
                id, event_type, payload, target_url, status, attempts, max_attempts,
                next_retry_at, created_at, updated_at
            ) VALUES ($1,$2,$3,$4,'pending',$5,$6,$7,$8,$9)
            "#,
        )
        .bind(job.id)
        .bind(&job.event_type)
        .bind(&job.payload)
        .bind(&job.target_url)
        .bind(job.attempts)
        .bind(job.max_attempts)
        .bind(job.next_retry_at)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn claim_due_job(&self) -> Result<Option<NotificationJob>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM notification_jobs
            WHERE status = 'pending' AND (next_retry_at IS NULL OR next_retry_at <= NOW())
            ORDER BY created_at ASC
            FOR UPDATE SKIP LOCKED
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_job).transpose()
    }

    async fn record_delivery(
        &self,
        id: Uuid,
        http_status: Option<i32>,
        response_body: &str,
        success: bool,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE notification_jobs
            SET http_status = $1, response_body = $2,
                status = CASE WHEN $3 THEN 'success' ELSE 'failed' END,
                attempts = attempts + 1, updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(http_status)
        .bind(response_body)
        .bind(success)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn schedule_retry(&self, id: Uuid, next_retry_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE notification_jobs
            SET status = 'pending', next_retry_at = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(next_retry_at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn job_by_id(&self, id: Uuid) -> Result<Option<NotificationJob>> {
        let row = sqlx::query(r#"SELECT * FROM notification_jobs WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_job).transpose()
    }
}
