//! Notification channel: bridges one connection to its per-user group.
//! Inbound frames are discarded; outbound events are produced elsewhere
//! (job, review and chat flows) and relayed verbatim.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use uuid::Uuid;

use crate::metrics;
use crate::state::AppState;
use crate::websocket::{chat::WsAuthParams, user_group};

/// GET /ws/notifications?token=...
///
/// Anonymous connections are rejected before the upgrade, no group join.
pub async fn ws_notifications_handler(
    State(state): State<AppState>,
    Query(params): Query<WsAuthParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let Some(token) = params.token else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let user_id =
        match crate::middleware::auth::authenticated_user_id(&token, &state.config.jwt_secret) {
            Ok(user_id) => user_id,
            Err(_) => return StatusCode::UNAUTHORIZED.into_response(),
        };

    ws.on_upgrade(move |socket| handle_notification_socket(state, user_id, socket))
}

async fn handle_notification_socket(state: AppState, user_id: Uuid, socket: WebSocket) {
    let group = user_group(user_id);
    let (subscription_id, mut rx) = state.bus.join(&group).await;
    metrics::ws_connection_opened("notifications");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            maybe = rx.recv() => match maybe {
                Some(msg) => {
                    if sender.send(msg).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // no inbound events are processed
                Some(Err(_)) => break,
            },
        }
    }

    state.bus.leave(&group, subscription_id).await;
    metrics::ws_connection_closed("notifications");
}
