use std::sync::Arc;

use driveflow_backend::models::notification_job::JobStatus;
use driveflow_backend::services::notification_service::NotificationService;
use driveflow_backend::store::MemoryStore;
use serde_json::json;

#[tokio::test]
async fn failed_delivery_is_retried_with_backoff() {
    let store = Arc::new(MemoryStore::new());
    // Nothing listens on the discard port; delivery fails immediately.
    let service = NotificationService::new(store.clone(), "http://127.0.0.1:9/hook".to_string());

    let job = service
        .enqueue("interview_invite", json!({"drive_id": "d-1"}))
        .await
        .expect("enqueue");

    let processed = service.run_once().await.expect("worker pass");
    assert!(processed);

    let updated = service.job(job.id).await.unwrap().unwrap();
    assert_eq!(updated.attempts, 1);
    // Attempts remain, so the job went back to pending with a retry time.
    assert_eq!(updated.status, JobStatus::Pending);
    assert!(updated.next_retry_at.is_some());

    // The retry is in the future; an immediate second pass finds nothing due.
    let processed = service.run_once().await.expect("second pass");
    assert!(!processed);
}

#[tokio::test]
async fn idle_worker_reports_no_work() {
    let store = Arc::new(MemoryStore::new());
    let service = NotificationService::new(store, "http://127.0.0.1:9/hook".to_string());
    assert!(!service.run_once().await.unwrap());
}
