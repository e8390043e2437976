use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use uuid::Uuid;

use debate_shared::errors::{AppError, AppResult};
use debate_shared::types::pagination::PaginationParams;

use crate::models::{
    ModerationAction, NewModerationAction, NewReport, Report, ReportCounts, ReportStatus,
    ReportedContent,
};

use super::{duplicate_report, report_not_found, stale_status, ModerationStore};

#[derive(Default)]
struct Inner {
    // Both vectors are kept in insertion (= creation) order.
    actions: Vec<ModerationAction>,
    reports: Vec<Report>,
}

impl Inner {
    fn report_mut(&mut self, report_id: Uuid) -> AppResult<&mut Report> {
        self.reports
            .iter_mut()
            .find(|r| r.id == report_id)
            .ok_or_else(report_not_found)
    }

    fn has_pending(&self, reporter_id: Uuid, content: &ReportedContent) -> bool {
        self.reports.iter().any(|r| {
            r.reporter_id == reporter_id
                && r.reported_content == *content
                && r.status == ReportStatus::Pending
        })
    }

    fn transition(
        &mut self,
        report_id: Uuid,
        expected: ReportStatus,
        target: ReportStatus,
        moderator_id: Uuid,
    ) -> AppResult<Report> {
        let report = self.report_mut(report_id)?;
        if report.status != expected {
            return Err(stale_status(report_id, expected));
        }
        report.status = target;
        report.reviewed_by = Some(moderator_id);
        report.reviewed_at = Some(Utc::now());
        Ok(report.clone())
    }

    fn push_action(&mut self, action: NewModerationAction) -> ModerationAction {
        let stored = ModerationAction {
            id: Uuid::now_v7(),
            moderator_id: action.moderator_id,
            user_id: action.user_id,
            report_id: action.report_id,
            action_type: action.action_type,
            violation_type: action.violation_type,
            description: action.description,
            created_at: Utc::now(),
        };
        self.actions.push(stored.clone());
        stored
    }
}

/// Process-local store for tests and single-node development runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AppResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| AppError::internal("moderation store lock poisoned"))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| AppError::internal("moderation store lock poisoned"))
    }
}

impl ModerationStore for MemoryStore {
    fn moderation_actions(&self, user_id: Uuid) -> AppResult<Vec<ModerationAction>> {
        Ok(self
            .read()?
            .actions
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    fn record_action(&self, action: NewModerationAction) -> AppResult<ModerationAction> {
        Ok(self.write()?.push_action(action))
    }

    fn report(&self, report_id: Uuid) -> AppResult<Option<Report>> {
        Ok(self.read()?.reports.iter().find(|r| r.id == report_id).cloned())
    }

    fn reports(
        &self,
        status: Option<ReportStatus>,
        page: &PaginationParams,
    ) -> AppResult<(Vec<Report>, u64)> {
        let inner = self.read()?;
        let matching: Vec<&Report> = inner
            .reports
            .iter()
            .rev()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .collect();

        let items = page.slice(&matching).iter().map(|r| (*r).clone()).collect();
        Ok((items, matching.len() as u64))
    }

    fn report_counts(&self) -> AppResult<ReportCounts> {
        let mut counts = ReportCounts::default();
        for report in &self.read()?.reports {
            counts.add(report.status, 1);
        }
        Ok(counts)
    }

    fn file_report(&self, report: NewReport) -> AppResult<Report> {
        let mut inner = self.write()?;
        if inner.has_pending(report.reporter_id, &report.reported_content) {
            return Err(duplicate_report());
        }

        let stored = Report {
            id: Uuid::now_v7(),
            reporter_id: report.reporter_id,
            reported_content: report.reported_content,
            violation_type: report.violation_type,
            description: report.description,
            status: ReportStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            created_at: Utc::now(),
        };
        inner.reports.push(stored.clone());
        Ok(stored)
    }

    fn has_pending_report(&self, reporter_id: Uuid, content: &ReportedContent) -> AppResult<bool> {
        Ok(self.read()?.has_pending(reporter_id, content))
    }

    fn update_report_status(
        &self,
        report_id: Uuid,
        expected: ReportStatus,
        target: ReportStatus,
        moderator_id: Uuid,
    ) -> AppResult<Report> {
        self.write()?.transition(report_id, expected, target, moderator_id)
    }

    fn record_action_and_review(
        &self,
        action: NewModerationAction,
        report_id: Uuid,
    ) -> AppResult<(ModerationAction, Report)> {
        let mut inner = self.write()?;
        let moderator_id = action.moderator_id;

        // Check the report first so a failed transition leaves no action behind.
        let current = inner.report_mut(report_id)?.status;
        if current != ReportStatus::Pending {
            return Err(stale_status(report_id, ReportStatus::Pending));
        }

        let recorded = inner.push_action(action);
        let report = inner.transition(report_id, ReportStatus::Pending, ReportStatus::Reviewed, moderator_id)?;
        Ok((recorded, report))
    }

    fn ping(&self) -> AppResult<()> {
        self.read().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionType, ViolationType};
    use debate_shared::errors::ErrorCode;

    fn new_report(reporter_id: Uuid, content: ReportedContent) -> NewReport {
        NewReport {
            reporter_id,
            reported_content: content,
            violation_type: ViolationType::Spam,
            description: "link farm".into(),
        }
    }

    fn warning(moderator_id: Uuid, user_id: Uuid, report_id: Option<Uuid>) -> NewModerationAction {
        NewModerationAction {
            moderator_id,
            user_id,
            report_id,
            action_type: ActionType::Warning,
            violation_type: ViolationType::Spam,
            description: "first notice".into(),
        }
    }

    #[test]
    fn history_is_per_user_and_newest_first() {
        let store = MemoryStore::new();
        let moderator = Uuid::new_v4();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let first = store.record_action(warning(moderator, alice, None)).unwrap();
        store.record_action(warning(moderator, bob, None)).unwrap();
        let second = store.record_action(warning(moderator, alice, None)).unwrap();

        let history = store.moderation_actions(alice).unwrap();
        assert_eq!(history.iter().map(|a| a.id).collect::<Vec<_>>(), vec![second.id, first.id]);
    }

    #[test]
    fn status_update_is_compare_and_set() {
        let store = MemoryStore::new();
        let report = store
            .file_report(new_report(Uuid::new_v4(), ReportedContent::Post { post_id: 1 }))
            .unwrap();
        let moderator = Uuid::new_v4();

        let resolved = store
            .update_report_status(report.id, ReportStatus::Pending, ReportStatus::Resolved, moderator)
            .unwrap();
        assert_eq!(resolved.status, ReportStatus::Resolved);
        assert_eq!(resolved.reviewed_by, Some(moderator));

        let err = store
            .update_report_status(report.id, ReportStatus::Pending, ReportStatus::Reviewed, moderator)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::StaleReportStatus);
    }

    #[test]
    fn unknown_report_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_report_status(Uuid::new_v4(), ReportStatus::Pending, ReportStatus::Resolved, Uuid::new_v4())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ReportNotFound);
    }

    #[test]
    fn action_and_review_happen_together() {
        let store = MemoryStore::new();
        let subject = Uuid::new_v4();
        let moderator = Uuid::new_v4();
        let report = store
            .file_report(new_report(Uuid::new_v4(), ReportedContent::UserProfile { user_id: subject }))
            .unwrap();

        let (action, reviewed) = store
            .record_action_and_review(warning(moderator, subject, Some(report.id)), report.id)
            .unwrap();
        assert_eq!(action.report_id, Some(report.id));
        assert_eq!(reviewed.status, ReportStatus::Reviewed);

        // Second attempt on a reviewed report records nothing.
        let err = store
            .record_action_and_review(warning(moderator, subject, Some(report.id)), report.id)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::StaleReportStatus);
        assert_eq!(store.moderation_actions(subject).unwrap().len(), 1);
    }

    #[test]
    fn listing_filters_and_paginates() {
        let store = MemoryStore::new();
        let reporter = Uuid::new_v4();
        let mut ids = Vec::new();
        for post_id in 0..5 {
            ids.push(store.file_report(new_report(reporter, ReportedContent::Post { post_id })).unwrap().id);
        }
        store
            .update_report_status(ids[0], ReportStatus::Pending, ReportStatus::Resolved, Uuid::new_v4())
            .unwrap();

        let (pending, total) = store
            .reports(Some(ReportStatus::Pending), &PaginationParams::new(1, 2))
            .unwrap();
        assert_eq!(total, 4);
        assert_eq!(pending.iter().map(|r| r.id).collect::<Vec<_>>(), vec![ids[4], ids[3]]);

        let counts = store.report_counts().unwrap();
        assert_eq!(counts, ReportCounts { pending: 4, reviewed: 0, resolved: 1 });
    }

    #[test]
    fn duplicate_detection_only_counts_pending() {
        let store = MemoryStore::new();
        let reporter = Uuid::new_v4();
        let content = ReportedContent::Reply { reply_id: 12 };
        let report = store.file_report(new_report(reporter, content)).unwrap();

        assert!(store.has_pending_report(reporter, &content).unwrap());
        assert!(!store.has_pending_report(Uuid::new_v4(), &content).unwrap());

        store
            .update_report_status(report.id, ReportStatus::Pending, ReportStatus::Resolved, Uuid::new_v4())
            .unwrap();
        assert!(!store.has_pending_report(reporter, &content).unwrap());
        store.file_report(new_report(reporter, content)).unwrap();
    }

    #[test]
    fn second_pending_report_on_same_content_is_refused() {
        let store = MemoryStore::new();
        let reporter = Uuid::new_v4();
        let content = ReportedContent::Post { post_id: 77 };
        store.file_report(new_report(reporter, content)).unwrap();

        let err = store.file_report(new_report(reporter, content)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateReport);

        let (all, total) = store.reports(None, &PaginationParams::default()).unwrap();
        assert_eq!(total, 1);
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn concurrent_filings_store_one_pending_report() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let reporter = Uuid::new_v4();
        let content = ReportedContent::Reply { reply_id: 5 };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.file_report(new_report(reporter, content)).is_ok())
            })
            .collect();
        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(accepted, 1);
        assert_eq!(store.report_counts().unwrap().pending, 1);
    }
}
