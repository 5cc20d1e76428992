use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, patch, post},
    Router,
};
use driveflow_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes,
    services::judge_service::JudgeService,
    store::PgStore,
    AppState,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let store = Arc::new(PgStore::new(pool));
    let judge = Arc::new(JudgeService::new(
        config.judge_base_url.clone(),
        config.judge_api_key.clone(),
        config.judge_timeout_secs,
    ));
    let app_state = AppState::new(
        store,
        judge,
        config.notify_webhook_url.clone(),
        config.judge_concurrency,
    );

    {
        let notif = app_state.notification_service.clone();
        tokio::spawn(async move {
            loop {
                match notif.run_once().await {
                    Ok(true) => {}
                    Ok(false) => {
                        tokio::time::sleep(Duration::from_millis(1000)).await;
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "Notification worker error");
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            }
        });
    }

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let drive_api = Router::new()
        .route(
            "/api/drives",
            get(routes::drive::list_drives).post(routes::drive::create_drive),
        )
        .route("/api/drives/:id", get(routes::drive::get_drive))
        .route(
            "/api/drives/:id/status",
            patch(routes::drive::update_drive_status),
        )
        .route("/api/drives/:id/progress", get(routes::drive::get_progress))
        .route(
            "/api/drives/:id/candidates",
            get(routes::drive::list_candidates).post(routes::drive::enroll_candidate),
        )
        .route(
            "/api/drives/:id/candidates/shortlisted",
            get(routes::drive::list_shortlisted),
        )
        .route(
            "/api/drives/:id/candidates/selected",
            get(routes::drive::list_selected),
        )
        .route(
            "/api/drives/:id/finalize-selection",
            post(routes::drive::finalize_selection),
        )
        .route(
            "/api/drives/:id/round-outcome",
            post(routes::drive::record_round_outcome),
        )
        .route(
            "/api/drives/:id/deadlines",
            patch(routes::drive::update_deadlines),
        )
        .route(
            "/api/drives/:id/deadline",
            get(routes::drive::get_active_deadline),
        )
        .layer(axum::middleware::from_fn_with_state(
            driveflow_backend::middleware::rate_limit::new_rps_state(config.integration_rps),
            driveflow_backend::middleware::rate_limit::rps_middleware,
        ));

    let submission_api = Router::new()
        .route(
            "/api/submissions",
            post(routes::submission::create_submission),
        )
        .route(
            "/api/submissions/questions",
            post(routes::submission::submit_question),
        )
        .route(
            "/api/submissions/finalize",
            post(routes::submission::final_submit),
        )
        .route(
            "/api/submissions/:id",
            get(routes::submission::get_submission),
        )
        .route(
            "/api/submissions/:id/statistics",
            get(routes::submission::get_statistics),
        )
        .route(
            "/api/submissions/candidate/:candidate_id",
            get(routes::submission::list_by_candidate),
        )
        .route(
            "/api/submissions/drive/:drive_id",
            get(routes::submission::list_by_drive),
        )
        .layer(axum::middleware::from_fn_with_state(
            driveflow_backend::middleware::rate_limit::new_rps_state(config.public_rps),
            driveflow_backend::middleware::rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(drive_api)
        .merge(submission_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
