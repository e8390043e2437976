use std::collections::BTreeSet;
use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use debate_shared::errors::{AppError, AppResult, ErrorCode};
use debate_shared::types::api::HealthCheck;
use debate_shared::types::pagination::{Paginated, PaginationParams};

use crate::engine::{self, EscalationHint, EscalationState};
use crate::events::EventPublisher;
use crate::models::{
    ActionType, ModerationAction, NewReport, Report, ReportCounts, ReportStatus, ReportedContent,
    ViolationType,
};
use crate::store::{duplicate_report, ModerationStore};

const MAX_DESCRIPTION_LEN: u64 = 2000;

#[derive(Debug, Deserialize, Validate)]
pub struct FileReportRequest {
    pub reported_content: ReportedContent,
    pub violation_type: ViolationType,
    #[validate(length(min = 1, max = 2000, message = "description must be 1-2000 characters"))]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ModerateReportRequest {
    pub action_type: ActionType,
    /// Defaults to the report's violation type.
    pub violation_type: Option<ViolationType>,
    /// Defaults to the report's description.
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EscalationSummary {
    pub user_id: Uuid,
    pub state: EscalationState,
    pub permitted_actions: BTreeSet<ActionType>,
    pub hint: EscalationHint,
    pub history: Vec<ModerationAction>,
}

#[derive(Debug, Serialize)]
pub struct ModerationOutcome {
    pub action: ModerationAction,
    pub report: Report,
}

/// Report intake and admin review on top of a [`ModerationStore`].
#[derive(Clone)]
pub struct ModerationService {
    store: Arc<dyn ModerationStore>,
    events: EventPublisher,
}

impl ModerationService {
    pub fn new(store: Arc<dyn ModerationStore>, events: EventPublisher) -> Self {
        Self { store, events }
    }

    pub async fn file_report(&self, reporter_id: Uuid, mut request: FileReportRequest) -> AppResult<Report> {
        // Limits apply to the stored text, so trim before validating.
        request.description = request.description.trim().to_string();
        request
            .validate()
            .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

        if request.reported_content.subject() == Some(reporter_id) {
            return Err(AppError::new(ErrorCode::CannotReportSelf, "you cannot report yourself"));
        }

        // Early answer for the common case; `file_report` re-checks atomically.
        if self.store.has_pending_report(reporter_id, &request.reported_content)? {
            return Err(duplicate_report());
        }

        let report = self.store.file_report(NewReport {
            reporter_id,
            reported_content: request.reported_content,
            violation_type: request.violation_type,
            description: request.description,
        })?;

        tracing::info!(
            report_id = %report.id,
            reporter_id = %reporter_id,
            content_kind = report.reported_content.kind(),
            violation_type = %report.violation_type,
            "report filed"
        );
        counter!("moderation_reports_filed_total", "violation_type" => report.violation_type.as_str()).increment(1);

        self.events.publish_report_created(&report).await;
        Ok(report)
    }

    pub fn list_reports(
        &self,
        status: Option<ReportStatus>,
        page: &PaginationParams,
    ) -> AppResult<Paginated<Report>> {
        let (items, total) = self.store.reports(status, page)?;
        Ok(Paginated::new(items, total, page))
    }

    pub fn report_counts(&self) -> AppResult<ReportCounts> {
        self.store.report_counts()
    }

    pub fn report(&self, report_id: Uuid) -> AppResult<Report> {
        self.store
            .report(report_id)?
            .ok_or_else(|| AppError::new(ErrorCode::ReportNotFound, "report not found"))
    }

    pub fn escalation_summary(&self, user_id: Uuid) -> AppResult<EscalationSummary> {
        let history = self.store.moderation_actions(user_id)?;
        let state = engine::compute_escalation_state(&history);

        Ok(EscalationSummary {
            user_id,
            state,
            permitted_actions: engine::permitted_actions(state),
            hint: engine::escalation_hint(state),
            history,
        })
    }

    /// Issue a moderation action against the subject of a pending report and
    /// mark the report reviewed in the same step.
    pub async fn moderate_report(
        &self,
        moderator_id: Uuid,
        report_id: Uuid,
        request: ModerateReportRequest,
    ) -> AppResult<ModerationOutcome> {
        let report = self.report(report_id)?;
        if report.status != ReportStatus::Pending {
            return Err(AppError::new(
                ErrorCode::ReportAlreadyReviewed,
                "this report has already been reviewed",
            ));
        }

        let history = match report.reported_content.subject() {
            Some(subject) => self.store.moderation_actions(subject)?,
            None => Vec::new(),
        };

        let description = request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(report.description.as_str());
        if description.chars().count() as u64 > MAX_DESCRIPTION_LEN {
            return Err(AppError::new(ErrorCode::ValidationError, "description must be 1-2000 characters"));
        }

        let new_action = engine::issue_moderation_action(
            &report,
            moderator_id,
            &history,
            request.action_type,
            request.violation_type.unwrap_or(report.violation_type),
            description,
        )?;

        let (action, reviewed) = self.store.record_action_and_review(new_action, report.id)?;

        tracing::info!(
            action_id = %action.id,
            report_id = %report.id,
            user_id = %action.user_id,
            moderator_id = %moderator_id,
            action_type = %action.action_type,
            "moderation action issued"
        );
        counter!("moderation_actions_total", "action_type" => action.action_type.as_str()).increment(1);

        self.events.publish_action_issued(&action).await;
        self.events
            .publish_report_status_changed(report.id, report.status, reviewed.status, moderator_id)
            .await;

        Ok(ModerationOutcome { action, report: reviewed })
    }

    /// Move a report along its lifecycle. Asking for the current status
    /// returns the report unchanged.
    pub async fn update_report_status(
        &self,
        moderator_id: Uuid,
        report_id: Uuid,
        target: ReportStatus,
    ) -> AppResult<Report> {
        let report = self.report(report_id)?;
        let next = engine::transition_report_status(report.status, target)?;
        if next == report.status {
            tracing::debug!(report_id = %report_id, status = %next, "report already in requested status");
            return Ok(report);
        }

        let updated = self
            .store
            .update_report_status(report_id, report.status, next, moderator_id)?;

        tracing::info!(
            report_id = %report_id,
            from = %report.status,
            to = %updated.status,
            moderator_id = %moderator_id,
            "report status updated"
        );

        self.events
            .publish_report_status_changed(report_id, report.status, updated.status, moderator_id)
            .await;
        Ok(updated)
    }

    /// Store check, plus the broker check when events are enabled.
    pub fn health_checks(&self) -> Vec<HealthCheck> {
        let mut checks = vec![self.store_health()];
        checks.extend(self.events.health());
        checks
    }

    pub fn store_health(&self) -> HealthCheck {
        match self.store.ping() {
            Ok(()) => HealthCheck::healthy("store"),
            Err(e) => {
                tracing::warn!(error = %e, "store health check failed");
                HealthCheck::unhealthy("store", e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewModerationAction, NewReport};
    use crate::store::MemoryStore;
    use debate_shared::types::api::HealthStatus;

    fn service() -> (ModerationService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (ModerationService::new(store.clone(), EventPublisher::disabled()), store)
    }

    fn profile_report(user_id: Uuid) -> FileReportRequest {
        FileReportRequest {
            reported_content: ReportedContent::UserProfile { user_id },
            violation_type: ViolationType::Harassment,
            description: "  keeps attacking people instead of ideas  ".into(),
        }
    }

    fn request(action_type: ActionType) -> ModerateReportRequest {
        ModerateReportRequest {
            action_type,
            violation_type: None,
            description: None,
        }
    }

    fn seed_actions(store: &MemoryStore, user_id: Uuid, action_type: ActionType, n: usize) {
        for _ in 0..n {
            store
                .record_action(NewModerationAction {
                    moderator_id: Uuid::new_v4(),
                    user_id,
                    report_id: None,
                    action_type,
                    violation_type: ViolationType::Spam,
                    description: "seeded".into(),
                })
                .unwrap();
        }
    }

    /// Delegates to a memory store but refuses every status update.
    struct StatusWriteFails(MemoryStore);

    impl ModerationStore for StatusWriteFails {
        fn moderation_actions(&self, user_id: Uuid) -> AppResult<Vec<ModerationAction>> {
            self.0.moderation_actions(user_id)
        }

        fn record_action(&self, action: NewModerationAction) -> AppResult<ModerationAction> {
            self.0.record_action(action)
        }

        fn report(&self, report_id: Uuid) -> AppResult<Option<Report>> {
            self.0.report(report_id)
        }

        fn reports(
            &self,
            status: Option<ReportStatus>,
            page: &PaginationParams,
        ) -> AppResult<(Vec<Report>, u64)> {
            self.0.reports(status, page)
        }

        fn report_counts(&self) -> AppResult<ReportCounts> {
            self.0.report_counts()
        }

        fn file_report(&self, report: NewReport) -> AppResult<Report> {
            self.0.file_report(report)
        }

        fn has_pending_report(&self, reporter_id: Uuid, content: &ReportedContent) -> AppResult<bool> {
            self.0.has_pending_report(reporter_id, content)
        }

        fn update_report_status(
            &self,
            _report_id: Uuid,
            _expected: ReportStatus,
            _target: ReportStatus,
            _moderator_id: Uuid,
        ) -> AppResult<Report> {
            Err(AppError::internal("connection reset"))
        }

        fn ping(&self) -> AppResult<()> {
            Err(AppError::internal("connection reset"))
        }
    }

    #[tokio::test]
    async fn filing_trims_description() {
        let (service, _) = service();
        let report = service
            .file_report(Uuid::new_v4(), profile_report(Uuid::new_v4()))
            .await
            .unwrap();

        assert_eq!(report.status, ReportStatus::Pending);
        assert_eq!(report.description, "keeps attacking people instead of ideas");
    }

    #[tokio::test]
    async fn blank_description_is_rejected() {
        let (service, _) = service();
        let mut request = profile_report(Uuid::new_v4());
        request.description = "   ".into();

        let err = service.file_report(Uuid::new_v4(), request).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn length_limit_applies_after_trimming() {
        let (service, _) = service();
        let mut request = profile_report(Uuid::new_v4());
        request.description = format!("  {}  ", "x".repeat(2000));

        let report = service.file_report(Uuid::new_v4(), request).await.unwrap();
        assert_eq!(report.description.len(), 2000);

        let mut request = profile_report(Uuid::new_v4());
        request.description = "x".repeat(2001);
        let err = service.file_report(Uuid::new_v4(), request).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn cannot_report_own_profile() {
        let (service, _) = service();
        let me = Uuid::new_v4();
        let err = service.file_report(me, profile_report(me)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::CannotReportSelf);
    }

    #[tokio::test]
    async fn duplicate_pending_report_is_rejected() {
        let (service, _) = service();
        let reporter = Uuid::new_v4();
        let target = Uuid::new_v4();

        service.file_report(reporter, profile_report(target)).await.unwrap();
        let err = service.file_report(reporter, profile_report(target)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateReport);
    }

    #[tokio::test]
    async fn warning_marks_report_reviewed() {
        let (service, _) = service();
        let subject = Uuid::new_v4();
        let moderator = Uuid::new_v4();
        let report = service.file_report(Uuid::new_v4(), profile_report(subject)).await.unwrap();

        let outcome = service
            .moderate_report(moderator, report.id, request(ActionType::Warning))
            .await
            .unwrap();

        assert_eq!(outcome.action.user_id, subject);
        assert_eq!(outcome.action.violation_type, ViolationType::Harassment);
        assert_eq!(outcome.action.description, report.description);
        assert_eq!(outcome.report.status, ReportStatus::Reviewed);
        assert_eq!(outcome.report.reviewed_by, Some(moderator));
        assert_eq!(service.report(report.id).unwrap().status, ReportStatus::Reviewed);
    }

    #[tokio::test]
    async fn strike_requires_three_warnings() {
        let (service, store) = service();
        let subject = Uuid::new_v4();
        let report = service.file_report(Uuid::new_v4(), profile_report(subject)).await.unwrap();

        seed_actions(&store, subject, ActionType::Warning, 2);
        let err = service
            .moderate_report(Uuid::new_v4(), report.id, request(ActionType::Strike))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ThresholdNotMet);
        assert_eq!(service.report(report.id).unwrap().status, ReportStatus::Pending);

        seed_actions(&store, subject, ActionType::Warning, 1);
        let outcome = service
            .moderate_report(Uuid::new_v4(), report.id, request(ActionType::Strike))
            .await
            .unwrap();
        assert_eq!(outcome.action.action_type, ActionType::Strike);
    }

    #[tokio::test]
    async fn post_report_cannot_be_actioned_but_can_be_dismissed() {
        let (service, _) = service();
        let moderator = Uuid::new_v4();
        let report = service
            .file_report(
                Uuid::new_v4(),
                FileReportRequest {
                    reported_content: ReportedContent::Post { post_id: 77 },
                    violation_type: ViolationType::Spam,
                    description: "crypto giveaway".into(),
                },
            )
            .await
            .unwrap();

        let err = service
            .moderate_report(moderator, report.id, request(ActionType::Warning))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingSubject);

        let resolved = service
            .update_report_status(moderator, report.id, ReportStatus::Resolved)
            .await
            .unwrap();
        assert_eq!(resolved.status, ReportStatus::Resolved);
    }

    #[tokio::test]
    async fn reviewed_report_cannot_be_actioned_twice() {
        let (service, store) = service();
        let subject = Uuid::new_v4();
        let report = service.file_report(Uuid::new_v4(), profile_report(subject)).await.unwrap();

        service
            .moderate_report(Uuid::new_v4(), report.id, request(ActionType::Warning))
            .await
            .unwrap();
        let err = service
            .moderate_report(Uuid::new_v4(), report.id, request(ActionType::Warning))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::ReportAlreadyReviewed);
        assert_eq!(store.moderation_actions(subject).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn status_changes_follow_lifecycle() {
        let (service, _) = service();
        let moderator = Uuid::new_v4();
        let report = service.file_report(Uuid::new_v4(), profile_report(Uuid::new_v4())).await.unwrap();

        let reviewed = service
            .update_report_status(moderator, report.id, ReportStatus::Reviewed)
            .await
            .unwrap();
        assert_eq!(reviewed.status, ReportStatus::Reviewed);

        let again = service
            .update_report_status(moderator, report.id, ReportStatus::Reviewed)
            .await
            .unwrap();
        assert_eq!(again, reviewed);

        let err = service
            .update_report_status(moderator, report.id, ReportStatus::Pending)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::IllegalTransition);
    }

    #[tokio::test]
    async fn failed_review_after_recorded_action_is_partial_failure() {
        let store = Arc::new(StatusWriteFails(MemoryStore::new()));
        let service = ModerationService::new(store.clone(), EventPublisher::disabled());
        let subject = Uuid::new_v4();
        let report = service.file_report(Uuid::new_v4(), profile_report(subject)).await.unwrap();

        let err = service
            .moderate_report(Uuid::new_v4(), report.id, request(ActionType::Warning))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::PartialModerationFailure);
        assert_eq!(store.moderation_actions(subject).unwrap().len(), 1);
        assert_eq!(service.report(report.id).unwrap().status, ReportStatus::Pending);
    }

    #[tokio::test]
    async fn summary_reports_permitted_actions() {
        let (service, store) = service();
        let subject = Uuid::new_v4();
        seed_actions(&store, subject, ActionType::Warning, 3);
        seed_actions(&store, subject, ActionType::Strike, 1);

        let summary = service.escalation_summary(subject).unwrap();
        assert_eq!(summary.state, EscalationState { warning_count: 3, strike_count: 1 });
        assert_eq!(summary.permitted_actions, BTreeSet::from(ActionType::ALL));
        assert_eq!(summary.hint, EscalationHint::BanEligible);
        assert_eq!(summary.history.len(), 4);
    }

    #[test]
    fn health_reflects_store() {
        let (service, _) = service();
        assert_eq!(service.store_health().status, HealthStatus::Healthy);
        // No broker check while events are disabled.
        let checks = service.health_checks();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].name, "store");

        let broken = ModerationService::new(
            Arc::new(StatusWriteFails(MemoryStore::new())),
            EventPublisher::disabled(),
        );
        assert_eq!(broken.store_health().status, HealthStatus::Unhealthy);
    }
}
