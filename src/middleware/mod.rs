pub mod auth;
pub mod error_handling;
pub mod guards;
pub mod logging;

use axum::Router;

/// Apply default middleware layers (logging, etc.)
pub fn with_defaults<S: Clone + Send + Sync + 'static>(router: Router<S>) -> Router<S> {
    logging::add_tracing(router)
}
