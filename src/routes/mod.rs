use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;

use crate::middleware::auth::auth_middleware;
use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod categories;
pub mod conversations;
pub mod jobs;
pub mod notifications;
pub mod providers;

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "service": "marketplace-service" }))
}

/// Assemble the full application router. Authenticated routes sit behind the
/// bearer-token middleware; WebSocket endpoints carry their token as a query
/// parameter and authorize before the upgrade instead.
pub fn build_router(state: AppState) -> Router {
    let auth = axum_middleware::from_fn_with_state(state.clone(), auth_middleware);

    let public = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(crate::metrics::metrics_handler))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        // mixed method routers: reads are public, writes require a token
        .route(
            "/api/services/categories",
            get(categories::list_categories)
                .merge(post(categories::create_category).route_layer(auth.clone())),
        )
        .route(
            "/api/services/providers",
            get(providers::list_providers)
                .merge(post(providers::create_profile).route_layer(auth.clone())),
        )
        .route("/api/services/providers/:id", get(providers::get_provider))
        .route(
            "/api/services/providers/:id/reviews",
            get(providers::list_reviews)
                .merge(post(providers::create_review).route_layer(auth.clone())),
        )
        .route(
            "/ws/chat/:conversation_id",
            get(crate::websocket::chat::ws_chat_handler),
        )
        .route(
            "/ws/notifications",
            get(crate::websocket::notifications::ws_notifications_handler),
        );

    let protected = Router::new()
        .route("/api/auth/me", get(auth::me).put(auth::update_me))
        .route(
            "/api/services/providers/:id/availability",
            get(providers::get_availability).put(providers::set_availability),
        )
        .route("/api/jobs", get(jobs::list_jobs).post(jobs::create_job))
        .route("/api/jobs/:id", get(jobs::get_job))
        .route("/api/jobs/:id/apply", post(jobs::apply))
        .route("/api/jobs/:id/applications", get(jobs::list_applications))
        .route("/api/jobs/applications/:id/respond", post(jobs::respond))
        .route("/api/jobs/:id/status", post(jobs::update_status))
        .route(
            "/api/jobs/:id/updates",
            get(jobs::list_updates).post(jobs::create_update),
        )
        .route(
            "/api/chat/conversations",
            get(conversations::list_conversations),
        )
        .route(
            "/api/chat/conversations/:id",
            get(conversations::get_conversation),
        )
        .route(
            "/api/chat/conversations/:id/messages",
            get(conversations::list_messages).post(conversations::send_message),
        )
        .route("/api/notifications", get(notifications::list))
        .route("/api/notifications/:id/read", put(notifications::mark_read))
        .route("/api/notifications/read_all", post(notifications::read_all))
        .route("/api/admin/verify", get(admin::verify))
        .route("/api/admin/stats", get(admin::stats))
        .route("/api/admin/activity", get(admin::activity))
        .route("/api/admin/status", get(admin::status))
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/users/:id/verify", put(admin::verify_user))
        .layer(auth);

    let router = public
        .merge(protected)
        .layer(axum_middleware::from_fn(crate::metrics::track_http_metrics))
        .with_state(state);

    crate::middleware::with_defaults(router)
}
