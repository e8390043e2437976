use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use debate_shared::clients::db::{checkout, DbConn, DbPool};
use debate_shared::errors::{AppError, AppResult};
use debate_shared::types::pagination::PaginationParams;

use crate::models::{
    ModerationAction, ModerationActionRow, NewModerationAction, NewModerationActionRow, NewReport,
    NewReportRow, Report, ReportCounts, ReportRow, ReportStatus, ReportedContent,
};
use crate::schema::{moderation_actions, reports};

use super::{duplicate_report, report_not_found, stale_status, ModerationStore};

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> AppResult<DbConn> {
        checkout(&self.pool)
    }
}

fn insert_action(conn: &mut PgConnection, action: &NewModerationAction) -> AppResult<ModerationAction> {
    let row: ModerationActionRow = diesel::insert_into(moderation_actions::table)
        .values(&NewModerationActionRow::from(action))
        .get_result(conn)?;
    Ok(row.try_into()?)
}

/// Conditional update: only touches the row while it still has `expected`.
fn transition(
    conn: &mut PgConnection,
    report_id: Uuid,
    expected: ReportStatus,
    target: ReportStatus,
    moderator_id: Uuid,
) -> AppResult<Report> {
    let updated: Option<ReportRow> = diesel::update(
        reports::table
            .filter(reports::id.eq(report_id))
            .filter(reports::status.eq(expected.as_str())),
    )
    .set((
        reports::status.eq(target.as_str()),
        reports::reviewed_by.eq(Some(moderator_id)),
        reports::reviewed_at.eq(Some(Utc::now())),
    ))
    .get_result(conn)
    .optional()?;

    match updated {
        Some(row) => Ok(row.try_into()?),
        None => {
            let exists: Option<Uuid> = reports::table
                .find(report_id)
                .select(reports::id)
                .first(conn)
                .optional()?;
            Err(match exists {
                Some(_) => stale_status(report_id, expected),
                None => report_not_found(),
            })
        }
    }
}

impl ModerationStore for PgStore {
    fn moderation_actions(&self, user_id: Uuid) -> AppResult<Vec<ModerationAction>> {
        let mut conn = self.conn()?;
        let rows = moderation_actions::table
            .filter(moderation_actions::user_id.eq(user_id))
            .order(moderation_actions::created_at.desc())
            .load::<ModerationActionRow>(&mut conn)?;

        rows.into_iter()
            .map(|row| ModerationAction::try_from(row).map_err(AppError::from))
            .collect()
    }

    fn record_action(&self, action: NewModerationAction) -> AppResult<ModerationAction> {
        let mut conn = self.conn()?;
        insert_action(&mut conn, &action)
    }

    fn report(&self, report_id: Uuid) -> AppResult<Option<Report>> {
        let mut conn = self.conn()?;
        let row = reports::table
            .find(report_id)
            .first::<ReportRow>(&mut conn)
            .optional()?;

        Ok(row.map(Report::try_from).transpose()?)
    }

    fn reports(
        &self,
        status: Option<ReportStatus>,
        page: &PaginationParams,
    ) -> AppResult<(Vec<Report>, u64)> {
        let mut conn = self.conn()?;

        let mut query = reports::table.into_boxed();
        if let Some(status) = status {
            query = query.filter(reports::status.eq(status.as_str()));
        }
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
        let limit = i64::try_from(page.limit()).unwrap_or(i64::MAX);
        let rows = query
            .order(reports::created_at.desc())
            .offset(offset)
            .limit(limit)
            .load::<ReportRow>(&mut conn)?;

        let total: i64 = match status {
            Some(status) => reports::table
                .filter(reports::status.eq(status.as_str()))
                .count()
                .get_result(&mut conn)?,
            None => reports::table.count().get_result(&mut conn)?,
        };

        let items = rows
            .into_iter()
            .map(|row| Report::try_from(row).map_err(AppError::from))
            .collect::<AppResult<Vec<_>>>()?;
        Ok((items, total as u64))
    }

    fn report_counts(&self) -> AppResult<ReportCounts> {
        let mut conn = self.conn()?;
        let grouped: Vec<(String, i64)> = reports::table
            .group_by(reports::status)
            .select((reports::status, diesel::dsl::count_star()))
            .load(&mut conn)?;

        let mut counts = ReportCounts::default();
        for (status, n) in grouped {
            counts.add(status.parse()?, n as u64);
        }
        Ok(counts)
    }

    fn file_report(&self, report: NewReport) -> AppResult<Report> {
        let mut conn = self.conn()?;
        // The partial unique index on pending reports rejects concurrent duplicates.
        let row: ReportRow = diesel::insert_into(reports::table)
            .values(&NewReportRow::from(&report))
            .get_result(&mut conn)
            .map_err(|e| match e {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => duplicate_report(),
                other => AppError::from(other),
            })?;
        Ok(row.try_into()?)
    }

    fn has_pending_report(&self, reporter_id: Uuid, content: &ReportedContent) -> AppResult<bool> {
        let mut conn = self.conn()?;

        let mut query = reports::table
            .filter(reports::reporter_id.eq(reporter_id))
            .filter(reports::status.eq(ReportStatus::Pending.as_str()))
            .filter(reports::content_kind.eq(content.kind()))
            .into_boxed();
        query = match content {
            ReportedContent::Post { post_id } => query.filter(reports::content_id.eq(*post_id)),
            ReportedContent::Reply { reply_id } => query.filter(reports::content_id.eq(*reply_id)),
            ReportedContent::UserProfile { user_id } => {
                query.filter(reports::content_user_id.eq(*user_id))
            }
        };

        let existing: Option<Uuid> = query.select(reports::id).first(&mut conn).optional()?;
        Ok(existing.is_some())
    }

    fn update_report_status(
        &self,
        report_id: Uuid,
        expected: ReportStatus,
        target: ReportStatus,
        moderator_id: Uuid,
    ) -> AppResult<Report> {
        let mut conn = self.conn()?;
        transition(&mut conn, report_id, expected, target, moderator_id)
    }

    fn record_action_and_review(
        &self,
        action: NewModerationAction,
        report_id: Uuid,
    ) -> AppResult<(ModerationAction, Report)> {
        let mut pooled = self.conn()?;
        let conn: &mut PgConnection = &mut pooled;

        conn.transaction::<_, AppError, _>(|conn| {
            let recorded = insert_action(conn, &action)?;
            let report = transition(
                conn,
                report_id,
                ReportStatus::Pending,
                ReportStatus::Reviewed,
                action.moderator_id,
            )?;
            Ok((recorded, report))
        })
    }

    fn ping(&self) -> AppResult<()> {
        let mut conn = self.conn()?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok(())
    }
}
