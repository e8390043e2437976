//! Escalation rules for moderation actions and the report status machine.
//!
//! Everything here is a pure function of its arguments: no I/O, no clock, no
//! shared state. Callers fetch history from the store, ask the engine what is
//! allowed, and persist the result themselves.

use std::collections::BTreeSet;

use serde::Serialize;
use uuid::Uuid;

use debate_shared::errors::{AppError, ErrorCode};

use crate::models::{ActionType, ModerationAction, NewModerationAction, Report, ReportStatus, ViolationType};

/// Warnings a user must have received before a strike can be issued.
pub const STRIKE_WARNING_THRESHOLD: usize = 3;
/// Strikes a user must have received before a ban can be issued.
pub const BAN_STRIKE_THRESHOLD: usize = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EscalationState {
    pub warning_count: usize,
    pub strike_count: usize,
}

/// Next escalation step a moderator should be told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationHint {
    None,
    StrikeEligible,
    BanEligible,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EscalationError {
    #[error("{requested} requires more prior actions ({} warnings, {} strikes on record)", .state.warning_count, .state.strike_count)]
    ThresholdNotMet {
        requested: ActionType,
        state: EscalationState,
    },

    #[error("report {report_id} does not target a user profile")]
    MissingSubject { report_id: Uuid },

    #[error("report status cannot move from {from} to {to}")]
    IllegalTransition { from: ReportStatus, to: ReportStatus },
}

impl From<EscalationError> for AppError {
    fn from(err: EscalationError) -> Self {
        let (code, details) = match &err {
            EscalationError::ThresholdNotMet { requested, state } => (
                ErrorCode::ThresholdNotMet,
                serde_json::json!({
                    "requested": requested,
                    "warning_count": state.warning_count,
                    "strike_count": state.strike_count,
                    "permitted_actions": permitted_actions(*state),
                }),
            ),
            EscalationError::MissingSubject { report_id } => (
                ErrorCode::MissingSubject,
                serde_json::json!({ "report_id": report_id }),
            ),
            EscalationError::IllegalTransition { from, to } => (
                ErrorCode::IllegalTransition,
                serde_json::json!({ "from": from, "to": to }),
            ),
        };
        AppError::with_details(code, err.to_string(), details)
    }
}

/// Count warnings and strikes. Order of `history` is irrelevant.
pub fn compute_escalation_state<'a, I>(history: I) -> EscalationState
where
    I: IntoIterator<Item = &'a ModerationAction>,
{
    history
        .into_iter()
        .fold(EscalationState::default(), |mut state, action| {
            match action.action_type {
                ActionType::Warning => state.warning_count += 1,
                ActionType::Strike => state.strike_count += 1,
                ActionType::Ban => {}
            }
            state
        })
}

pub fn permitted_actions(state: EscalationState) -> BTreeSet<ActionType> {
    ActionType::ALL
        .into_iter()
        .filter(|action| match action {
            ActionType::Warning => true,
            ActionType::Strike => state.warning_count >= STRIKE_WARNING_THRESHOLD,
            ActionType::Ban => state.strike_count >= BAN_STRIKE_THRESHOLD,
        })
        .collect()
}

pub fn escalation_hint(state: EscalationState) -> EscalationHint {
    if state.strike_count >= BAN_STRIKE_THRESHOLD {
        EscalationHint::BanEligible
    } else if state.warning_count >= STRIKE_WARNING_THRESHOLD {
        EscalationHint::StrikeEligible
    } else {
        EscalationHint::None
    }
}

/// Validate `requested` against the report's subject and their history.
///
/// Only actions in `history` that target the report's subject are counted.
/// The returned action still has to be stored together with a
/// `pending -> reviewed` transition of `report`.
pub fn issue_moderation_action(
    report: &Report,
    moderator_id: Uuid,
    history: &[ModerationAction],
    requested: ActionType,
    violation_type: ViolationType,
    description: &str,
) -> Result<NewModerationAction, EscalationError> {
    let subject = report
        .reported_content
        .subject()
        .ok_or(EscalationError::MissingSubject { report_id: report.id })?;

    let state = compute_escalation_state(history.iter().filter(|a| a.user_id == subject));
    if !permitted_actions(state).contains(&requested) {
        return Err(EscalationError::ThresholdNotMet { requested, state });
    }

    Ok(NewModerationAction {
        moderator_id,
        user_id: subject,
        report_id: Some(report.id),
        action_type: requested,
        violation_type,
        description: description.to_string(),
    })
}

/// Requesting the current status is a no-op success so retries are safe.
pub fn transition_report_status(
    current: ReportStatus,
    target: ReportStatus,
) -> Result<ReportStatus, EscalationError> {
    use ReportStatus::*;

    match (current, target) {
        (from, to) if from == to => Ok(to),
        (Pending, Reviewed) | (Pending, Resolved) | (Reviewed, Resolved) => Ok(target),
        (from, to) => Err(EscalationError::IllegalTransition { from, to }),
    }
}
