pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod websocket;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
