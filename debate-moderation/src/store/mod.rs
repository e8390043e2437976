//! Persistence boundary for reports and moderation history.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use uuid::Uuid;

use debate_shared::errors::{AppError, AppResult, ErrorCode};
use debate_shared::types::pagination::PaginationParams;

use crate::models::{
    ModerationAction, NewModerationAction, NewReport, Report, ReportCounts, ReportStatus,
    ReportedContent,
};

/// Backend operations the moderation service relies on.
///
/// Status updates are compare-and-set on the caller's view of the current
/// status, so two moderators acting on the same report cannot both win.
pub trait ModerationStore: Send + Sync {
    /// A user's moderation history, newest first.
    fn moderation_actions(&self, user_id: Uuid) -> AppResult<Vec<ModerationAction>>;

    fn record_action(&self, action: NewModerationAction) -> AppResult<ModerationAction>;

    fn report(&self, report_id: Uuid) -> AppResult<Option<Report>>;

    /// Reports newest first, optionally restricted to one status, with the
    /// total number of matching reports.
    fn reports(
        &self,
        status: Option<ReportStatus>,
        page: &PaginationParams,
    ) -> AppResult<(Vec<Report>, u64)>;

    fn report_counts(&self) -> AppResult<ReportCounts>;

    /// Store a new pending report. Fails with `DuplicateReport` when the
    /// reporter already has a pending report on the same content; the check
    /// and the insert are one atomic step.
    fn file_report(&self, report: NewReport) -> AppResult<Report>;

    fn has_pending_report(&self, reporter_id: Uuid, content: &ReportedContent) -> AppResult<bool>;

    /// Move a report from `expected` to `target`. Fails with
    /// `StaleReportStatus` when the stored status is no longer `expected`.
    fn update_report_status(
        &self,
        report_id: Uuid,
        expected: ReportStatus,
        target: ReportStatus,
        moderator_id: Uuid,
    ) -> AppResult<Report>;

    /// Store `action` and move its report from pending to reviewed.
    ///
    /// Stores that can do both writes atomically override this. The default
    /// runs them in sequence and reports a failed second write as
    /// `PartialModerationFailure`, since the action is already on record.
    fn record_action_and_review(
        &self,
        action: NewModerationAction,
        report_id: Uuid,
    ) -> AppResult<(ModerationAction, Report)> {
        let moderator_id = action.moderator_id;
        let recorded = self.record_action(action)?;

        match self.update_report_status(report_id, ReportStatus::Pending, ReportStatus::Reviewed, moderator_id) {
            Ok(report) => Ok((recorded, report)),
            Err(err) => {
                tracing::error!(
                    action_id = %recorded.id,
                    report_id = %report_id,
                    error = %err,
                    "moderation action recorded but report left pending"
                );
                Err(partial_failure(&recorded, report_id, &err))
            }
        }
    }

    fn ping(&self) -> AppResult<()>;
}

pub(crate) fn partial_failure(action: &ModerationAction, report_id: Uuid, cause: &AppError) -> AppError {
    AppError::with_details(
        ErrorCode::PartialModerationFailure,
        "moderation action was recorded but the report could not be marked reviewed",
        serde_json::json!({
            "action_id": action.id,
            "report_id": report_id,
            "cause": cause.to_string(),
        }),
    )
}

pub(crate) fn stale_status(report_id: Uuid, expected: ReportStatus) -> AppError {
    AppError::with_details(
        ErrorCode::StaleReportStatus,
        "report status changed concurrently, reload and retry",
        serde_json::json!({ "report_id": report_id, "expected": expected }),
    )
}

pub(crate) fn duplicate_report() -> AppError {
    AppError::new(
        ErrorCode::DuplicateReport,
        "you already have a pending report for this content",
    )
}

pub(crate) fn report_not_found() -> AppError {
    AppError::new(ErrorCode::ReportNotFound, "report not found")
}
