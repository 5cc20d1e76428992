use std::sync::Arc;

use chrono::{Duration, Utc};
use reqwest::Client;
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use crate::error::Result;
use crate::models::drive::Drive;
use crate::models::drive_candidate::DriveCandidate;
use crate::models::notification_job::{JobStatus, NotificationJob};
use crate::store::Store;

/// Outbox-backed notification dispatch. State transitions only enqueue;
/// delivery happens on the background worker with at-least-once semantics
/// and bounded retries. Template rendering and sending live behind the
/// webhook target.
#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn Store>,
    client: Client,
    target_url: String,
}

impl NotificationService {
    pub fn new(store: Arc<dyn Store>, target_url: String) -> Self {
        Self {
            store,
            client: Client::new(),
            target_url,
        }
    }

    pub async fn enqueue(&self, event_type: &str, payload: JsonValue) -> Result<NotificationJob> {
        let job = NotificationJob::new(event_type, payload, &self.target_url);
        self.store.enqueue_job(&job).await?;
        tracing::info!(job_id = %job.id, event_type, "notification enqueued");
        Ok(job)
    }

    /// Round-appropriate invite for a newly scheduled round: assessment
    /// invites for coding rounds, interview invites otherwise.
    pub async fn enqueue_round_invites(
        &self,
        drive: &Drive,
        round_number: i32,
        round_type: &str,
        coding: bool,
        candidates: &[JsonValue],
    ) -> Result<NotificationJob> {
        let event = if coding {
            "assessment_invite"
        } else {
            "interview_invite"
        };
        self.enqueue(
            event,
            json!({
                "drive_id": drive.id,
                "job_id": drive.job_id,
                "role": drive.role,
                "round_number": round_number,
                "round_type": round_type,
                "candidates": candidates,
            }),
        )
        .await
    }

    pub async fn enqueue_bulk_email(
        &self,
        drive: &Drive,
        candidates: &[DriveCandidate],
    ) -> Result<NotificationJob> {
        let recipients: Vec<JsonValue> = candidates
            .iter()
            .map(|c| json!({"candidate_id": c.candidate_id, "email": c.email}))
            .collect();
        self.enqueue(
            "drive_email",
            json!({
                "drive_id": drive.id,
                "job_id": drive.job_id,
                "role": drive.role,
                "recipients": recipients,
            }),
        )
        .await
    }

    pub async fn enqueue_selection_emails(
        &self,
        drive: &Drive,
        selected: &[JsonValue],
    ) -> Result<NotificationJob> {
        self.enqueue(
            "selection_email",
            json!({
                "drive_id": drive.id,
                "job_id": drive.job_id,
                "role": drive.role,
                "selected": selected,
            }),
        )
        .await
    }

    async fn deliver_once(&self, job: &NotificationJob) -> Result<()> {
        let res = self
            .client
            .post(&job.target_url)
            .json(&json!({
                "event": job.event_type,
                "payload": job.payload,
            }))
            .send()
            .await;

        match res {
            Ok(resp) => {
                let status = resp.status().as_u16() as i32;
                let body = resp.text().await.unwrap_or_default();
                let success = (200..300).contains(&status);
                self.store
                    .record_delivery(job.id, Some(status), &body, success)
                    .await?;
            }
            Err(err) => {
                self.store
                    .record_delivery(job.id, None, &err.to_string(), false)
                    .await?;
            }
        }
        Ok(())
    }

    /// One worker pass: claim the oldest due job, deliver it, schedule a
    /// retry with growing backoff while attempts remain. Returns whether a
    /// job was processed.
    pub async fn run_once(&self) -> Result<bool> {
        let Some(job) = self.store.claim_due_job().await? else {
            return Ok(false);
        };

        let _ = self.deliver_once(&job).await;

        if let Some(updated) = self.store.job_by_id(job.id).await? {
            if updated.status == JobStatus::Failed && updated.attempts < updated.max_attempts {
                let backoff_secs =
                    (30u64 * 2u64.saturating_pow(updated.attempts.saturating_sub(1) as u32))
                        .min(3600);
                self.store
                    .schedule_retry(job.id, Utc::now() + Duration::seconds(backoff_secs as i64))
                    .await?;
            } else if updated.status == JobStatus::Failed {
                tracing::error!(
                    job_id = %job.id,
                    event_type = %updated.event_type,
                    attempts = updated.attempts,
                    "notification delivery exhausted retries"
                );
            }
        }

        Ok(true)
    }

    pub async fn job(&self, id: Uuid) -> Result<Option<NotificationJob>> {
        self.store.job_by_id(id).await
    }
}
