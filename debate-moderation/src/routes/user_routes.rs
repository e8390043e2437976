use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use debate_shared::errors::AppResult;
use debate_shared::middleware::OptionalAuthUser;
use debate_shared::types::api::ApiResponse;
use debate_shared::types::auth::AuthUser;

use crate::models::Report;
use crate::service::FileReportRequest;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AdminStatus {
    pub is_admin: bool,
}

pub async fn create_report(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<FileReportRequest>,
) -> AppResult<Json<ApiResponse<Report>>> {
    let report = state.service.file_report(auth.id, body).await?;
    Ok(Json(ApiResponse::ok_with_message(report, "report submitted")))
}

/// Lets the client decide whether to show the moderator dashboard.
/// Guests and invalid tokens get `false` rather than an error.
pub async fn is_caller_admin(
    OptionalAuthUser(auth): OptionalAuthUser,
) -> Json<ApiResponse<AdminStatus>> {
    let is_admin = auth.as_ref().is_some_and(AuthUser::is_admin);
    Json(ApiResponse::ok(AdminStatus { is_admin }))
}
