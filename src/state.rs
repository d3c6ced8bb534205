use crate::{config::Config, websocket::ChannelBus};
use sqlx::{Pool, Postgres};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Postgres>,
    pub bus: ChannelBus,
    pub redis: redis::Client,
    pub config: Arc<Config>,
    /// Identifies this process in cross-instance relay envelopes
    pub instance_id: Uuid,
}
