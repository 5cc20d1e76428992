use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Success,
    Failed,
}

/// Outbox entry for a notification dispatch. Delivered at-least-once by the
/// background worker; failures are retried with growing backoff until
/// `max_attempts`, then left as `failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationJob {
    pub id: Uuid,
    pub event_type: String,
    pub payload: JsonValue,
    pub target_url: String,
    pub status: JobStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    #[serde(default)]
    pub next_retry_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub http_status: Option<i32>,
    #[serde(default)]
    pub response_body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationJob {
    pub fn new(event_type: &str, payload: JsonValue, target_url: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.to_string(),
            payload,
            target_url: target_url.to_string(),
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts: 3,
            next_retry_at: None,
            http_status: None,
            response_body: None,
            created_at: now,
            updated_at: now,
        }
    }
}
