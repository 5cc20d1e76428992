use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use crate::dto::drive_dto::{
    CreateDriveRequest, DriveTransition, EnrollCandidateRequest, ProgressSummary,
    RoundOutcomeRequest, UpdateDeadlinesRequest, UpdateDriveStatusRequest,
};
use crate::error::{Error, Result};
use crate::models::coding_question::CodingQuestion;
use crate::models::drive::{
    generate_round_statuses, generate_stages, Drive, DriveStatus, JobType, RoundSpec, RoundStatus,
};
use crate::models::drive_candidate::{
    CandidateRoundState, Decision, DriveCandidate, RoundResult,
};
use crate::services::notification_service::NotificationService;
use crate::services::round_projector::{FanOutReport, RoundProjector};
use crate::services::shortlist_service::ResumeScorer;
use crate::store::{CandidateRoundPatch, RoundStatePatch, Store};
use crate::utils::token::generate_access_token;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ShortlistReport {
    pub evaluated: usize,
    pub shortlisted: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SelectionReport {
    pub selected: usize,
    pub rejected: usize,
}

/// What one state-update request did. Round transitions return their
/// round-specific payload; everything else acknowledges the status change.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TransitionOutcome {
    StatusUpdated {
        status: DriveStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        shortlist: Option<ShortlistReport>,
    },
    RoundScheduled {
        round_number: i32,
        round_type: String,
        fan_out: FanOutReport,
    },
    RoundCompleted {
        round_number: i32,
        next_round: Option<i32>,
        next_round_type: Option<String>,
        fan_out: FanOutReport,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundProgress {
    pub round_number: i32,
    pub round_type: String,
    pub status: RoundStatus,
    pub scheduled_count: usize,
    pub completed_count: usize,
    pub passed_count: usize,
    pub total_candidates: usize,
    pub completion_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriveProgress {
    pub drive_id: Uuid,
    pub job_id: String,
    pub role: String,
    pub current_round: i32,
    pub total_rounds: usize,
    pub overall_status: DriveStatus,
    pub total_candidates: usize,
    pub round_details: Vec<RoundProgress>,
}

/// Owns the drive's overall status and per-round state array, and drives the
/// candidate-level projection on every round transition.
#[derive(Clone)]
pub struct DriveService {
    store: Arc<dyn Store>,
    projector: RoundProjector,
    scorer: Arc<dyn ResumeScorer>,
    notifications: NotificationService,
}

impl DriveService {
    pub fn new(
        store: Arc<dyn Store>,
        scorer: Arc<dyn ResumeScorer>,
        notifications: NotificationService,
    ) -> Self {
        let projector = RoundProjector::new(store.clone());
        Self {
            store,
            projector,
            scorer,
            notifications,
        }
    }

    pub async fn create_drive(&self, payload: CreateDriveRequest) -> Result<Drive> {
        let job_type = payload.job_type.unwrap_or_default();
        if job_type == JobType::Internship && payload.internship_duration.is_none() {
            return Err(Error::BadRequest(
                "internship_duration is required".to_string(),
            ));
        }
        if self.store.drive_by_job(&payload.job_id).await?.is_some() {
            return Err(Error::BadRequest(format!(
                "job_id '{}' already exists",
                payload.job_id
            )));
        }

        let now = Utc::now();

        let mut coding_question_ids = Vec::new();
        for q in &payload.coding_questions {
            let question = CodingQuestion {
                id: Uuid::new_v4(),
                company_id: payload.company_id.clone(),
                title: q.title.clone(),
                description: q.description.clone(),
                constraints: q.constraints.clone(),
                difficulty: q.difficulty.clone(),
                tags: q.tags.clone(),
                time_limit: q.time_limit,
                memory_limit: q.memory_limit,
                test_cases: q.test_cases.clone(),
                created_at: now,
                updated_at: now,
            };
            self.store.insert_question(&question).await?;
            coding_question_ids.push(question.id);
        }

        let mut round_inputs = payload.rounds;
        if round_inputs.is_empty() {
            round_inputs = vec![crate::dto::drive_dto::CreateRound {
                round_type: "Technical".to_string(),
                description: None,
                deadline: None,
            }];
        }
        let rounds: Vec<RoundSpec> = round_inputs
            .into_iter()
            .map(|r| RoundSpec {
                round_id: Uuid::new_v4(),
                round_type: r.round_type,
                description: r.description,
                deadline: r.deadline,
            })
            .collect();
        let round_statuses = generate_round_statuses(&rounds, now);
        let stages = generate_stages(&rounds);

        let drive = Drive {
            id: Uuid::new_v4(),
            company_id: payload.company_id,
            job_id: payload.job_id,
            role: payload.role,
            location: payload.location,
            candidates_to_hire: payload.candidates_to_hire,
            job_type,
            internship_duration: payload.internship_duration,
            skills: payload.skills,
            rounds,
            round_statuses,
            current_round: 0,
            status: DriveStatus::DriveCreated,
            stages,
            current_stage: 0,
            coding_question_ids,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_drive(&drive).await?;

        tracing::info!(drive_id = %drive.id, job_id = %drive.job_id, "drive created");
        Ok(drive)
    }

    pub async fn get_drive(&self, drive_id: Uuid) -> Result<Drive> {
        self.store
            .drive_by_id(drive_id)
            .await?
            .ok_or_else(|| Error::NotFound("Drive not found".to_string()))
    }

    pub async fn list_drives(&self, company_id: Option<&str>) -> Result<Vec<(Drive, ProgressSummary)>> {
        let drives = self.store.list_drives(company_id).await?;
        Ok(drives
            .into_iter()
            .map(|d| {
                let summary = progress_summary(&d);
                (d, summary)
            })
            .collect())
    }

    pub async fn enroll_candidate(
        &self,
        drive_id: Uuid,
        payload: EnrollCandidateRequest,
    ) -> Result<DriveCandidate> {
        let drive = self.get_drive(drive_id).await?;
        if self
            .store
            .candidate(drive.id, &payload.candidate_id)
            .await?
            .is_some()
        {
            return Err(Error::BadRequest(
                "Candidate already enrolled in this drive".to_string(),
            ));
        }

        let now = Utc::now();
        let candidate = DriveCandidate {
            id: Uuid::new_v4(),
            drive_id: drive.id,
            candidate_id: payload.candidate_id,
            name: payload.name,
            email: payload.email,
            resume_content: payload.resume_content,
            resume_score: None,
            resume_shortlisted: Decision::Unset,
            selected: Decision::Unset,
            current_round: 0,
            rounds_status: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_candidate(&candidate).await?;
        Ok(candidate)
    }

    /// The single state-update operation of the drive control surface.
    pub async fn update_status(
        &self,
        drive_id: Uuid,
        req: UpdateDriveStatusRequest,
    ) -> Result<TransitionOutcome> {
        let drive = self.get_drive(drive_id).await?;
        let transition = DriveTransition::parse(&req.status)
            .ok_or_else(|| Error::BadRequest(format!("Unknown status '{}'", req.status)))?;

        tracing::info!(
            drive_id = %drive_id,
            status = %req.status,
            round_number = ?req.round_number,
            "drive transition requested"
        );

        match transition {
            DriveTransition::ScheduleRound => {
                self.schedule_round(&drive, req.round_number, req.round_type)
                    .await
            }
            DriveTransition::CompleteRound => self.complete_round(&drive, req.round_number).await,
            DriveTransition::Status(status) => {
                let mut shortlist = None;
                match status {
                    DriveStatus::ResumeShortlisted => {
                        shortlist = Some(self.run_shortlisting(&drive).await?);
                    }
                    DriveStatus::EmailSent => {
                        let candidates = self.store.candidates_for_drive(drive.id).await?;
                        if let Err(err) =
                            self.notifications.enqueue_bulk_email(&drive, &candidates).await
                        {
                            tracing::warn!(error = %err, "bulk email dispatch failed; transition stands");
                        }
                    }
                    DriveStatus::SelectionEmailSent => {
                        if let Err(err) = self
                            .notifications
                            .enqueue_selection_emails(&drive, &[])
                            .await
                        {
                            tracing::warn!(error = %err, "selection email dispatch failed; transition stands");
                        }
                    }
                    _ => {}
                }

                self.store
                    .set_drive_status(drive.id, status, next_stage(&drive))
                    .await?;
                Ok(TransitionOutcome::StatusUpdated { status, shortlist })
            }
        }
    }

    /// Resume-shortlisting step: score every enrolled candidate against the
    /// drive's role and skills, persist the decision, and lazily initialize
    /// the per-candidate round array for the shortlisted ones. This is the
    /// one place that array is first created.
    async fn run_shortlisting(&self, drive: &Drive) -> Result<ShortlistReport> {
        let candidates = self.store.candidates_for_drive(drive.id).await?;
        let mut report = ShortlistReport {
            evaluated: candidates.len(),
            shortlisted: 0,
            rejected: 0,
        };

        let now = Utc::now();
        let template: Vec<CandidateRoundState> = drive
            .round_statuses
            .iter()
            .map(|rs| CandidateRoundState::from_round(rs, now))
            .collect();

        for candidate in &candidates {
            let resume = candidate.resume_content.as_deref().unwrap_or_default();
            let (score, shortlisted) = self.scorer.score(resume, &drive.role, &drive.skills);
            let decision = if shortlisted { Decision::Yes } else { Decision::No };
            self.store
                .set_shortlist(candidate.id, decision, Some(score))
                .await?;

            if shortlisted {
                report.shortlisted += 1;
                if candidate.rounds_status.is_empty() {
                    self.store
                        .set_rounds_status(candidate.id, &template)
                        .await?;
                }
            } else {
                report.rejected += 1;
            }
        }

        tracing::info!(
            drive_id = %drive.id,
            shortlisted = report.shortlisted,
            rejected = report.rejected,
            "resume shortlisting completed"
        );
        Ok(report)
    }

    async fn schedule_round(
        &self,
        drive: &Drive,
        round_number: Option<i32>,
        round_type: Option<String>,
    ) -> Result<TransitionOutcome> {
        let round_number = round_number.unwrap_or(drive.current_round + 1);
        let spec = drive
            .round_spec(round_number)
            .ok_or_else(|| Error::BadRequest("Invalid round number".to_string()))?;
        let round_type = round_type.unwrap_or_else(|| spec.round_type.clone());
        let coding = spec.is_coding();

        self.store
            .patch_round_state(
                drive.id,
                spec.round_id,
                &RoundStatePatch {
                    status: Some(RoundStatus::InProgress),
                    scheduled: Some(true),
                    ..Default::default()
                },
                Some(round_number),
            )
            .await?;

        let fan_out = self
            .projector
            .fan_out(
                drive.id,
                spec.round_id,
                round_number,
                &CandidateRoundPatch {
                    status: Some(RoundStatus::InProgress),
                    scheduled: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        // Invite dispatch is fire-and-forget: its failure never rolls the
        // transition back.
        let invited = self.build_invites(drive, spec, coding).await?;
        if let Err(err) = self
            .notifications
            .enqueue_round_invites(drive, round_number, &round_type, coding, &invited)
            .await
        {
            tracing::warn!(error = %err, "round invite dispatch failed; transition stands");
        }

        self.store.set_stage(drive.id, next_stage(drive)).await?;

        Ok(TransitionOutcome::RoundScheduled {
            round_number,
            round_type,
            fan_out,
        })
    }

    /// Per-candidate invite entries for the shortlisted set. Interview
    /// rounds also get a join link written onto the candidate's round entry.
    async fn build_invites(
        &self,
        drive: &Drive,
        spec: &RoundSpec,
        coding: bool,
    ) -> Result<Vec<JsonValue>> {
        let candidates = self.store.candidates_for_drive(drive.id).await?;
        let mut invited = Vec::new();
        for candidate in candidates
            .iter()
            .filter(|c| c.resume_shortlisted == Decision::Yes)
        {
            let access_token = generate_access_token(32);
            if !coding {
                let link = format!("/interview/{}", access_token);
                let patched = self
                    .store
                    .patch_candidate_round(
                        candidate.id,
                        spec.round_id,
                        &CandidateRoundPatch {
                            interview_link: Some(link),
                            ..Default::default()
                        },
                        None,
                    )
                    .await;
                if let Err(err) = patched {
                    tracing::warn!(
                        candidate_id = %candidate.candidate_id,
                        error = %err,
                        "could not attach interview link"
                    );
                }
            }
            invited.push(json!({
                "candidate_id": candidate.candidate_id,
                "email": candidate.email,
                "access_token": access_token,
            }));
        }
        Ok(invited)
    }

    async fn complete_round(
        &self,
        drive: &Drive,
        round_number: Option<i32>,
    ) -> Result<TransitionOutcome> {
        let round_number =
            round_number.ok_or_else(|| Error::BadRequest("round_number is required".to_string()))?;
        let spec = drive
            .round_spec(round_number)
            .ok_or_else(|| Error::BadRequest("Invalid round number".to_string()))?;

        self.store
            .patch_round_state(
                drive.id,
                spec.round_id,
                &RoundStatePatch {
                    status: Some(RoundStatus::Completed),
                    completed: Some(true),
                    ..Default::default()
                },
                None,
            )
            .await?;

        let fan_out = self
            .projector
            .fan_out(
                drive.id,
                spec.round_id,
                round_number,
                &CandidateRoundPatch {
                    status: Some(RoundStatus::Completed),
                    completed: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        // Completing the last round does not advance the drive by itself;
        // final selection is its own explicit operation.
        let next_round = if round_number < drive.rounds.len() as i32 {
            Some(round_number + 1)
        } else {
            None
        };
        let next_round_type = next_round
            .and_then(|nr| drive.round_spec(nr))
            .map(|s| s.round_type.clone());

        Ok(TransitionOutcome::RoundCompleted {
            round_number,
            next_round,
            next_round_type,
            fan_out,
        })
    }

    /// Explicit final-selection operation: requires every round completed,
    /// marks candidates who passed all rounds as selected, enqueues the
    /// selection emails and moves the drive to `SelectionEmailSent`.
    pub async fn finalize_selection(&self, drive_id: Uuid) -> Result<SelectionReport> {
        let drive = self.get_drive(drive_id).await?;
        if !drive.all_rounds_completed() {
            return Err(Error::Conflict(
                "All rounds must be completed before final selection".to_string(),
            ));
        }

        let candidates = self.store.candidates_for_drive(drive.id).await?;
        let mut report = SelectionReport {
            selected: 0,
            rejected: 0,
        };
        let mut selected_payload = Vec::new();

        for candidate in candidates
            .iter()
            .filter(|c| c.resume_shortlisted == Decision::Yes)
        {
            let passed = candidate.passed_all_rounds();
            let decision = if passed { Decision::Yes } else { Decision::No };
            self.store.set_selected(candidate.id, decision).await?;
            if passed {
                report.selected += 1;
                selected_payload.push(json!({
                    "candidate_id": candidate.candidate_id,
                    "email": candidate.email,
                }));
            } else {
                report.rejected += 1;
            }
        }

        if let Err(err) = self
            .notifications
            .enqueue_selection_emails(&drive, &selected_payload)
            .await
        {
            tracing::warn!(error = %err, "selection email dispatch failed; selection stands");
        }

        self.store
            .set_drive_status(drive.id, DriveStatus::SelectionEmailSent, next_stage(&drive))
            .await?;

        tracing::info!(
            drive_id = %drive_id,
            selected = report.selected,
            rejected = report.rejected,
            "final selection recorded"
        );
        Ok(report)
    }

    /// Round outcome written by the interview-evaluation collaborator (the
    /// coding round writes its own results through the grading pipeline).
    pub async fn record_round_outcome(
        &self,
        drive_id: Uuid,
        req: RoundOutcomeRequest,
    ) -> Result<()> {
        let drive = self.get_drive(drive_id).await?;
        let spec = drive
            .round_spec(req.round_number)
            .ok_or_else(|| Error::BadRequest("Invalid round number".to_string()))?;
        let candidate = self
            .store
            .candidate(drive.id, &req.candidate_id)
            .await?
            .ok_or_else(|| Error::NotFound("Candidate not found in this drive".to_string()))?;

        let patched = self
            .store
            .patch_candidate_round(
                candidate.id,
                spec.round_id,
                &CandidateRoundPatch {
                    result: Some(req.result),
                    score: req.score,
                    feedback: req.feedback,
                    ..Default::default()
                },
                None,
            )
            .await?;
        if !patched {
            return Err(Error::NotFound(
                "Candidate has no entry for this round".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn drive_candidates(&self, drive_id: Uuid) -> Result<Vec<DriveCandidate>> {
        let drive = self.get_drive(drive_id).await?;
        self.store.candidates_for_drive(drive.id).await
    }

    pub async fn shortlisted_candidates(&self, drive_id: Uuid) -> Result<Vec<DriveCandidate>> {
        Ok(self
            .drive_candidates(drive_id)
            .await?
            .into_iter()
            .filter(|c| c.resume_shortlisted == Decision::Yes)
            .collect())
    }

    pub async fn selected_candidates(&self, drive_id: Uuid) -> Result<Vec<DriveCandidate>> {
        Ok(self
            .drive_candidates(drive_id)
            .await?
            .into_iter()
            .filter(|c| c.selected == Decision::Yes)
            .collect())
    }

    /// Per-round candidate counters for the progress views.
    pub async fn progress(&self, drive_id: Uuid) -> Result<DriveProgress> {
        let drive = self.get_drive(drive_id).await?;
        let candidates = self.store.candidates_for_drive(drive.id).await?;
        let total_candidates = candidates
            .iter()
            .filter(|c| c.resume_shortlisted == Decision::Yes)
            .count();

        let round_details = drive
            .round_statuses
            .iter()
            .map(|rs| {
                let entries: Vec<_> = candidates
                    .iter()
                    .filter_map(|c| c.round_entry(rs.round_id))
                    .collect();
                let scheduled_count = entries.iter().filter(|e| e.scheduled).count();
                let completed_count = entries.iter().filter(|e| e.completed).count();
                let passed_count = entries
                    .iter()
                    .filter(|e| e.result == RoundResult::Passed)
                    .count();
                RoundProgress {
                    round_number: rs.round_number,
                    round_type: rs.round_type.clone(),
                    status: rs.status,
                    scheduled_count,
                    completed_count,
                    passed_count,
                    total_candidates,
                    completion_percentage: if total_candidates > 0 {
                        completed_count as f64 / total_candidates as f64 * 100.0
                    } else {
                        0.0
                    },
                }
            })
            .collect();

        Ok(DriveProgress {
            drive_id: drive.id,
            job_id: drive.job_id,
            role: drive.role,
            current_round: drive.current_round,
            total_rounds: drive.rounds.len(),
            overall_status: drive.status,
            total_candidates,
            round_details,
        })
    }

    /// Sync new deadlines onto the catalog, the round states and every
    /// candidate's entries. Reports are aggregate; a candidate without the
    /// entry is skipped.
    pub async fn update_round_deadlines(
        &self,
        drive_id: Uuid,
        req: UpdateDeadlinesRequest,
    ) -> Result<Vec<FanOutReport>> {
        let drive = self.get_drive(drive_id).await?;
        let mut reports = Vec::new();

        for item in &req.deadlines {
            let spec = drive
                .round_spec(item.round_number)
                .ok_or_else(|| Error::BadRequest("Invalid round number".to_string()))?;

            self.store
                .set_round_spec_deadline(drive.id, spec.round_id, item.deadline)
                .await?;
            self.store
                .patch_round_state(
                    drive.id,
                    spec.round_id,
                    &RoundStatePatch {
                        deadline: Some(item.deadline),
                        ..Default::default()
                    },
                    None,
                )
                .await?;

            let report = self
                .projector
                .fan_out(
                    drive.id,
                    spec.round_id,
                    item.round_number,
                    &CandidateRoundPatch {
                        deadline: Some(item.deadline),
                        ..Default::default()
                    },
                )
                .await?;
            reports.push(report);
        }
        Ok(reports)
    }

    /// Deadline of the round currently in progress, if any.
    pub async fn active_round_deadline(&self, drive_id: Uuid) -> Result<Option<DateTime<Utc>>> {
        let drive = self.get_drive(drive_id).await?;
        if drive.current_round < 1 {
            return Ok(None);
        }
        Ok(drive
            .round_statuses
            .iter()
            .find(|rs| rs.round_number == drive.current_round)
            .and_then(|rs| rs.deadline))
    }
}

fn next_stage(drive: &Drive) -> i32 {
    if drive.stages.is_empty() {
        return 0;
    }
    (drive.current_stage + 1).min(drive.stages.len() as i32 - 1)
}

pub fn progress_summary(drive: &Drive) -> ProgressSummary {
    let total_rounds = drive.rounds.len();
    ProgressSummary {
        current_round: drive.current_round,
        total_rounds,
        percentage: if total_rounds > 0 {
            drive.current_round as f64 / total_rounds as f64 * 100.0
        } else {
            0.0
        },
    }
}
