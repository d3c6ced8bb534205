use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use marketplace_service::config::Config;
use marketplace_service::error::AppError;
use marketplace_service::routes::build_router;
use marketplace_service::state::AppState;
use marketplace_service::websocket::{relay, ChannelBus};
use marketplace_service::{db, logging};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    logging::init_tracing();

    let config = Config::from_env()?;

    let pool = db::init_pool(&config.database_url)
        .await
        .map_err(|e| AppError::Config(format!("database pool: {e}")))?;
    db::MIGRATOR
        .run(&pool)
        .await
        .map_err(|e| AppError::Config(format!("migrations: {e}")))?;

    let redis_client = redis::Client::open(config.redis_url.as_str())
        .map_err(|e| AppError::Config(format!("redis: {e}")))?;

    let instance_id = Uuid::new_v4();
    let bus = ChannelBus::new();

    let state = AppState {
        db: pool,
        bus: bus.clone(),
        redis: redis_client.clone(),
        config: Arc::new(config.clone()),
        instance_id,
    };

    // cross-instance fan-out; the process serves local traffic even if the
    // relay connection drops
    tokio::spawn(async move {
        if let Err(e) = relay::start_relay_listener(redis_client, instance_id, bus).await {
            error!(error = %e, "relay listener exited");
        }
    });

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::StartServer(format!("bind {addr}: {e}")))?;
    info!(%addr, %instance_id, "marketplace-service listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::StartServer(e.to_string()))?;

    Ok(())
}
