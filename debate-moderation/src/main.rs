use std::sync::Arc;

use debate_shared::clients::db::create_pool;
use debate_shared::clients::rabbitmq::RabbitMQClient;
use debate_shared::middleware::{init_metrics, init_tracing};

use debate_moderation::config::{AppConfig, StoreBackend};
use debate_moderation::events::EventPublisher;
use debate_moderation::service::ModerationService;
use debate_moderation::store::{MemoryStore, ModerationStore, PgStore};
use debate_moderation::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("debate-moderation");

    let config = AppConfig::load()?;
    let port = config.port;

    let store: Arc<dyn ModerationStore> = match config.store {
        StoreBackend::Postgres => {
            let pool = create_pool(&config.database_url, config.db_pool_size)?;
            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory moderation store, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let events = match &config.rabbitmq_url {
        Some(url) => EventPublisher::new(RabbitMQClient::connect(url).await?),
        None => {
            tracing::info!("no rabbitmq_url configured, domain events disabled");
            EventPublisher::disabled()
        }
    };

    let metrics_handle = init_metrics()?;

    let state = Arc::new(AppState {
        service: ModerationService::new(store, events),
        metrics_handle: Some(metrics_handle),
    });

    let app = router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, store = ?config.store, "debate-moderation starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
