use lapin::{
    options::*, types::FieldTable, BasicProperties, Channel, Connection, ConnectionProperties,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::types::{Event, HealthCheck};

const EXCHANGE_NAME: &str = "debate.events";
const PERSISTENT: u8 = 2;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("broker error: {0}")]
    Broker(#[from] lapin::Error),

    #[error("broker rejected event {event_id} on {routing_key}")]
    Rejected { routing_key: String, event_id: uuid::Uuid },
}

impl From<PublishError> for AppError {
    fn from(err: PublishError) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

/// Publisher for the platform's topic exchange. The channel runs in confirm
/// mode, so `publish` only returns once the broker has taken the message.
#[derive(Clone)]
pub struct RabbitMQClient {
    channel: Channel,
}

impl RabbitMQClient {
    pub async fn connect(url: &str) -> Result<Self, lapin::Error> {
        let conn = Connection::connect(url, ConnectionProperties::default()).await?;
        let channel = conn.create_channel().await?;

        channel
            .exchange_declare(
                EXCHANGE_NAME,
                lapin::ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        channel.confirm_select(ConfirmSelectOptions::default()).await?;

        tracing::info!(exchange = EXCHANGE_NAME, "connected to RabbitMQ with publisher confirms");
        Ok(Self { channel })
    }

    pub async fn publish<T: Serialize>(
        &self,
        routing_key: &str,
        event: &Event<T>,
    ) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(event)?;

        let confirmation = self
            .channel
            .basic_publish(
                EXCHANGE_NAME,
                routing_key,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default()
                    .with_content_type("application/json".into())
                    .with_message_id(event.id.to_string().into())
                    .with_delivery_mode(PERSISTENT),
            )
            .await?
            .await?;

        if confirmation.is_nack() {
            return Err(PublishError::Rejected {
                routing_key: routing_key.to_string(),
                event_id: event.id,
            });
        }

        tracing::debug!(routing_key, event_id = %event.id, "event confirmed");
        Ok(())
    }

    /// Broker health. A dropped channel only degrades the service, since
    /// event delivery never gates a request.
    pub fn health(&self) -> HealthCheck {
        if self.channel.status().connected() {
            HealthCheck::healthy("rabbitmq")
        } else {
            HealthCheck::degraded("rabbitmq", "channel is not connected")
        }
    }
}
