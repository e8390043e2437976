use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use debate_shared::errors::AppResult;
use debate_shared::middleware::AdminUser;
use debate_shared::types::api::ApiResponse;
use debate_shared::types::pagination::{Paginated, PaginationParams};

use crate::models::{Report, ReportCounts, ReportStatus};
use crate::service::{EscalationSummary, ModerateReportRequest, ModerationOutcome};
use crate::AppState;

// --- Request types ---

#[derive(Debug, Deserialize)]
pub struct ReportFilterParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub status: Option<ReportStatus>,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

impl ReportFilterParams {
    fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.per_page)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ReportStatus,
}

// --- Reports ---

pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(params): Query<ReportFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<Report>>>> {
    let page = state.service.list_reports(params.status, &params.pagination())?;
    Ok(Json(ApiResponse::ok(page)))
}

pub async fn report_summary(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<Json<ApiResponse<ReportCounts>>> {
    Ok(Json(ApiResponse::ok(state.service.report_counts()?)))
}

pub async fn get_report(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(report_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Report>>> {
    Ok(Json(ApiResponse::ok(state.service.report(report_id)?)))
}

pub async fn update_report_status(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(report_id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> AppResult<Json<ApiResponse<Report>>> {
    let report = state
        .service
        .update_report_status(admin.0.id, report_id, body.status)
        .await?;
    Ok(Json(ApiResponse::ok(report)))
}

// --- Moderation ---

pub async fn moderate_report(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(report_id): Path<Uuid>,
    Json(body): Json<ModerateReportRequest>,
) -> AppResult<Json<ApiResponse<ModerationOutcome>>> {
    let outcome = state
        .service
        .moderate_report(admin.0.id, report_id, body)
        .await?;
    let message = format!("{} issued", outcome.action.action_type);
    Ok(Json(ApiResponse::ok_with_message(outcome, message)))
}

pub async fn get_user_moderation(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<EscalationSummary>>> {
    Ok(Json(ApiResponse::ok(state.service.escalation_summary(user_id)?)))
}
