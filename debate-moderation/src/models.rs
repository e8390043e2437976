use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use debate_shared::errors::AppError;

use crate::schema::{moderation_actions, reports};

/// A stored string did not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

impl From<UnknownVariant> for AppError {
    fn from(err: UnknownVariant) -> Self {
        AppError::internal(format!("corrupt moderation record: {err}"))
    }
}

// --- Enums ---

/// Ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Warning,
    Strike,
    Ban,
}

impl ActionType {
    pub const ALL: [ActionType; 3] = [ActionType::Warning, ActionType::Strike, ActionType::Ban];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Strike => "strike",
            Self::Ban => "ban",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warning" => Ok(Self::Warning),
            "strike" => Ok(Self::Strike),
            "ban" => Ok(Self::Ban),
            _ => Err(UnknownVariant::new("action type", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    Spam,
    Harassment,
    InappropriateContent,
    Other,
}

impl ViolationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spam => "spam",
            Self::Harassment => "harassment",
            Self::InappropriateContent => "inappropriate_content",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ViolationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ViolationType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spam" => Ok(Self::Spam),
            "harassment" => Ok(Self::Harassment),
            "inappropriate_content" => Ok(Self::InappropriateContent),
            "other" => Ok(Self::Other),
            _ => Err(UnknownVariant::new("violation type", s)),
        }
    }
}

/// Report lifecycle: `pending -> reviewed -> resolved`, or `pending -> resolved`
/// when a report is dismissed. `resolved` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Resolved,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 3] = [ReportStatus::Pending, ReportStatus::Reviewed, ReportStatus::Resolved];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
            Self::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReportStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "reviewed" => Ok(Self::Reviewed),
            "resolved" => Ok(Self::Resolved),
            _ => Err(UnknownVariant::new("report status", s)),
        }
    }
}

// --- Reported content ---

/// What a report points at. Only profile reports name a user directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportedContent {
    Post { post_id: i64 },
    Reply { reply_id: i64 },
    UserProfile { user_id: Uuid },
}

impl ReportedContent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Post { .. } => "post",
            Self::Reply { .. } => "reply",
            Self::UserProfile { .. } => "user_profile",
        }
    }

    /// The moderatable user behind this content, if any.
    pub fn subject(&self) -> Option<Uuid> {
        match self {
            Self::UserProfile { user_id } => Some(*user_id),
            Self::Post { .. } | Self::Reply { .. } => None,
        }
    }

    /// Split into the `(content_kind, content_id, content_user_id)` columns.
    pub fn to_columns(&self) -> (&'static str, Option<i64>, Option<Uuid>) {
        match self {
            Self::Post { post_id } => (self.kind(), Some(*post_id), None),
            Self::Reply { reply_id } => (self.kind(), Some(*reply_id), None),
            Self::UserProfile { user_id } => (self.kind(), None, Some(*user_id)),
        }
    }

    pub fn from_columns(
        kind: &str,
        content_id: Option<i64>,
        content_user_id: Option<Uuid>,
    ) -> Result<Self, UnknownVariant> {
        match (kind, content_id, content_user_id) {
            ("post", Some(post_id), None) => Ok(Self::Post { post_id }),
            ("reply", Some(reply_id), None) => Ok(Self::Reply { reply_id }),
            ("user_profile", None, Some(user_id)) => Ok(Self::UserProfile { user_id }),
            _ => Err(UnknownVariant::new("reported content", kind)),
        }
    }
}

// --- ModerationAction ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationAction {
    pub id: Uuid,
    pub moderator_id: Uuid,
    pub user_id: Uuid,
    pub report_id: Option<Uuid>,
    pub action_type: ActionType,
    pub violation_type: ViolationType,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// An action that passed escalation checks and is ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewModerationAction {
    pub moderator_id: Uuid,
    pub user_id: Uuid,
    pub report_id: Option<Uuid>,
    pub action_type: ActionType,
    pub violation_type: ViolationType,
    pub description: String,
}

#[derive(Debug, Queryable, Identifiable)]
#[diesel(table_name = moderation_actions)]
pub struct ModerationActionRow {
    pub id: Uuid,
    pub moderator_id: Uuid,
    pub user_id: Uuid,
    pub report_id: Option<Uuid>,
    pub action_type: String,
    pub violation_type: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = moderation_actions)]
pub struct NewModerationActionRow<'a> {
    pub moderator_id: Uuid,
    pub user_id: Uuid,
    pub report_id: Option<Uuid>,
    pub action_type: &'a str,
    pub violation_type: &'a str,
    pub description: &'a str,
}

impl<'a> From<&'a NewModerationAction> for NewModerationActionRow<'a> {
    fn from(action: &'a NewModerationAction) -> Self {
        Self {
            moderator_id: action.moderator_id,
            user_id: action.user_id,
            report_id: action.report_id,
            action_type: action.action_type.as_str(),
            violation_type: action.violation_type.as_str(),
            description: &action.description,
        }
    }
}

impl TryFrom<ModerationActionRow> for ModerationAction {
    type Error = UnknownVariant;

    fn try_from(row: ModerationActionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            moderator_id: row.moderator_id,
            user_id: row.user_id,
            report_id: row.report_id,
            action_type: row.action_type.parse()?,
            violation_type: row.violation_type.parse()?,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

// --- Report ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub reported_content: ReportedContent,
    pub violation_type: ViolationType,
    pub description: String,
    pub status: ReportStatus,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReport {
    pub reporter_id: Uuid,
    pub reported_content: ReportedContent,
    pub violation_type: ViolationType,
    pub description: String,
}

#[derive(Debug, Queryable, Identifiable)]
#[diesel(table_name = reports)]
pub struct ReportRow {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub content_kind: String,
    pub content_id: Option<i64>,
    pub content_user_id: Option<Uuid>,
    pub violation_type: String,
    pub description: String,
    pub status: String,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = reports)]
pub struct NewReportRow<'a> {
    pub reporter_id: Uuid,
    pub content_kind: &'a str,
    pub content_id: Option<i64>,
    pub content_user_id: Option<Uuid>,
    pub violation_type: &'a str,
    pub description: &'a str,
}

impl<'a> From<&'a NewReport> for NewReportRow<'a> {
    fn from(report: &'a NewReport) -> Self {
        let (content_kind, content_id, content_user_id) = report.reported_content.to_columns();
        Self {
            reporter_id: report.reporter_id,
            content_kind,
            content_id,
            content_user_id,
            violation_type: report.violation_type.as_str(),
            description: &report.description,
        }
    }
}

impl TryFrom<ReportRow> for Report {
    type Error = UnknownVariant;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            reporter_id: row.reporter_id,
            reported_content: ReportedContent::from_columns(
                &row.content_kind,
                row.content_id,
                row.content_user_id,
            )?,
            violation_type: row.violation_type.parse()?,
            description: row.description,
            status: row.status.parse()?,
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
            created_at: row.created_at,
        })
    }
}

/// Per-status report totals backing the dashboard tabs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCounts {
    pub pending: u64,
    pub reviewed: u64,
    pub resolved: u64,
}

impl ReportCounts {
    pub fn add(&mut self, status: ReportStatus, n: u64) {
        match status {
            ReportStatus::Pending => self.pending += n,
            ReportStatus::Reviewed => self.reviewed += n,
            ReportStatus::Resolved => self.resolved += n,
        }
    }
}
