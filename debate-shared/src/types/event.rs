use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ Event envelope wrapping all domain events.
///
/// Routing key format: `debate.{domain}.{entity}.{action}`
/// Example: `debate.moderation.report.created`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            correlation_id: None,
            user_id: None,
            data,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_correlation(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// RabbitMQ routing keys
pub mod routing_keys {
    pub const MODERATION_REPORT_CREATED: &str = "debate.moderation.report.created";
    pub const MODERATION_REPORT_STATUS_CHANGED: &str = "debate.moderation.report.status_changed";
    pub const MODERATION_ACTION_ISSUED: &str = "debate.moderation.action.issued";
}

/// Moderation event payloads. Enum-like fields travel as their
/// snake_case strings so consumers need no shared enum definitions.
pub mod payloads {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ReportCreated {
        pub report_id: Uuid,
        pub reporter_id: Uuid,
        pub content_kind: String,
        pub violation_type: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ReportStatusChanged {
        pub report_id: Uuid,
        pub from_status: String,
        pub to_status: String,
        pub changed_by: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ModerationActionIssued {
        pub action_id: Uuid,
        pub user_id: Uuid,
        pub moderator_id: Uuid,
        pub report_id: Option<Uuid>,
        pub action_type: String,
        pub violation_type: String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_user_and_correlation() {
        let user = Uuid::new_v4();
        let correlation = Uuid::new_v4();
        let event = Event::new(
            "debate-moderation",
            routing_keys::MODERATION_REPORT_STATUS_CHANGED,
            payloads::ReportStatusChanged {
                report_id: Uuid::new_v4(),
                from_status: "pending".into(),
                to_status: "resolved".into(),
                changed_by: user,
            },
        )
        .with_user(user)
        .with_correlation(correlation);

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event_type"], "debate.moderation.report.status_changed");
        assert_eq!(value["user_id"], user.to_string());
        assert_eq!(value["correlation_id"], correlation.to_string());
        assert_eq!(value["data"]["to_status"], "resolved");
    }
}
