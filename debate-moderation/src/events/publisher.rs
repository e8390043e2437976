use serde::Serialize;
use uuid::Uuid;

use debate_shared::clients::rabbitmq::RabbitMQClient;
use debate_shared::types::api::HealthCheck;
use debate_shared::types::event::{payloads, routing_keys, Event};

use crate::models::{ModerationAction, Report, ReportStatus};

const SOURCE: &str = "debate-moderation";

/// Best-effort domain event fan-out. A publish failure is logged and never
/// fails the request that triggered it.
#[derive(Clone, Default)]
pub struct EventPublisher {
    rabbitmq: Option<RabbitMQClient>,
}

impl EventPublisher {
    pub fn new(rabbitmq: RabbitMQClient) -> Self {
        Self { rabbitmq: Some(rabbitmq) }
    }

    pub fn disabled() -> Self {
        Self { rabbitmq: None }
    }

    /// Broker check for the health route; `None` while publishing is disabled.
    pub fn health(&self) -> Option<HealthCheck> {
        self.rabbitmq.as_ref().map(RabbitMQClient::health)
    }

    async fn publish<T: Serialize>(&self, routing_key: &str, event: Event<T>) {
        let Some(rabbitmq) = &self.rabbitmq else {
            tracing::debug!(routing_key, "event publishing disabled, dropping event");
            return;
        };

        if let Err(e) = rabbitmq.publish(routing_key, &event).await {
            tracing::error!(error = %e, routing_key, "failed to publish event");
        }
    }

    pub async fn publish_report_created(&self, report: &Report) {
        let event = Event::new(
            SOURCE,
            routing_keys::MODERATION_REPORT_CREATED,
            payloads::ReportCreated {
                report_id: report.id,
                reporter_id: report.reporter_id,
                content_kind: report.reported_content.kind().to_string(),
                violation_type: report.violation_type.to_string(),
            },
        )
        .with_user(report.reporter_id);

        self.publish(routing_keys::MODERATION_REPORT_CREATED, event).await;
    }

    pub async fn publish_action_issued(&self, action: &ModerationAction) {
        let mut event = Event::new(
            SOURCE,
            routing_keys::MODERATION_ACTION_ISSUED,
            payloads::ModerationActionIssued {
                action_id: action.id,
                user_id: action.user_id,
                moderator_id: action.moderator_id,
                report_id: action.report_id,
                action_type: action.action_type.to_string(),
                violation_type: action.violation_type.to_string(),
            },
        )
        .with_user(action.user_id);
        if let Some(report_id) = action.report_id {
            event = event.with_correlation(report_id);
        }

        self.publish(routing_keys::MODERATION_ACTION_ISSUED, event).await;
    }

    pub async fn publish_report_status_changed(
        &self,
        report_id: Uuid,
        from: ReportStatus,
        to: ReportStatus,
        changed_by: Uuid,
    ) {
        let event = Event::new(
            SOURCE,
            routing_keys::MODERATION_REPORT_STATUS_CHANGED,
            payloads::ReportStatusChanged {
                report_id,
                from_status: from.to_string(),
                to_status: to.to_string(),
                changed_by,
            },
        )
        .with_correlation(report_id);

        self.publish(routing_keys::MODERATION_REPORT_STATUS_CHANGED, event).await;
    }
}
