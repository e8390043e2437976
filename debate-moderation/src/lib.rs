//! Report intake, escalation rules and admin review for debate content.

use axum::routing::{get, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use debate_shared::middleware::metrics_middleware;

pub mod config;
pub mod engine;
pub mod events;
pub mod models;
pub mod routes;
pub mod schema;
pub mod service;
pub mod store;

use service::ModerationService;

pub struct AppState {
    pub service: ModerationService,
    /// `None` when no Prometheus recorder was installed (tests).
    pub metrics_handle: Option<PrometheusHandle>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let admin_routes = Router::new()
        .route("/reports", get(routes::admin_routes::list_reports))
        .route("/reports/summary", get(routes::admin_routes::report_summary))
        .route("/reports/:id", get(routes::admin_routes::get_report))
        .route("/reports/:id/status", put(routes::admin_routes::update_report_status))
        .route("/reports/:id/actions", post(routes::admin_routes::moderate_report))
        .route("/users/:id/moderation", get(routes::admin_routes::get_user_moderation));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .route("/me/is-admin", get(routes::user_routes::is_caller_admin))
        .route("/reports", post(routes::user_routes::create_report))
        .nest("/admin", admin_routes)
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
