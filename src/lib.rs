pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod utils;

use std::sync::Arc;

use crate::services::{
    drive_service::DriveService, grading_service::GradingService, judge_service::Judge,
    notification_service::NotificationService, shortlist_service::KeywordScorer,
    shortlist_service::ResumeScorer, submission_service::SubmissionService,
};
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub drive_service: DriveService,
    pub submission_service: SubmissionService,
    pub notification_service: NotificationService,
}

impl AppState {
    /// Wire the services over an injected store and judge. Production passes
    /// `PgStore` and the HTTP judge client; tests pass `MemoryStore` and a
    /// judge double.
    pub fn new(
        store: Arc<dyn Store>,
        judge: Arc<dyn Judge>,
        notify_webhook_url: String,
        judge_concurrency: usize,
    ) -> Self {
        let notification_service = NotificationService::new(store.clone(), notify_webhook_url);
        let scorer: Arc<dyn ResumeScorer> = Arc::new(KeywordScorer::default());
        let drive_service =
            DriveService::new(store.clone(), scorer, notification_service.clone());
        let grading = GradingService::new(store.clone(), judge, judge_concurrency);
        let submission_service = SubmissionService::new(store.clone(), grading);

        Self {
            store,
            drive_service,
            submission_service,
            notification_service,
        }
    }
}
