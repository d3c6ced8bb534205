//! Conversation channel: bridges one live connection to its conversation
//! group, with authorization, persistence and read-receipt side effects.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::error::AppResult;
use crate::metrics;
use crate::models::{chat::Conversation, notification::kinds, Message as ChatMessageRow, User};
use crate::services::{chat_service::ChatService, notification_service::NotificationService};
use crate::state::AppState;
use crate::websocket::{broadcast_json, chat_group, events::ChatInbound, events::ChatOutbound};

#[derive(Debug, Deserialize)]
pub struct WsAuthParams {
    pub token: Option<String>,
}

/// GET /ws/chat/:conversation_id?token=...
///
/// Authorization happens before the upgrade: a missing token, a missing
/// conversation, or a third-party identity all reject the handshake and no
/// data is exchanged.
pub async fn ws_chat_handler(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
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

    let conversation = match ChatService::get_conversation(&state.db, conversation_id).await {
        Ok(Some(conversation)) => conversation,
        Ok(None) => return StatusCode::FORBIDDEN.into_response(),
        Err(e) => {
            warn!(%conversation_id, error = %e, "conversation lookup failed at connect");
            return StatusCode::FORBIDDEN.into_response();
        }
    };
    if conversation.customer_id != user_id && conversation.provider_id != user_id {
        return StatusCode::FORBIDDEN.into_response();
    }

    let user = match ChatService::get_user(&state.db, user_id).await {
        Ok(Some(user)) => user,
        _ => return StatusCode::UNAUTHORIZED.into_response(),
    };

    ws.on_upgrade(move |socket| handle_chat_socket(state, conversation, user, socket))
}

async fn handle_chat_socket(
    state: AppState,
    conversation: Conversation,
    user: User,
    socket: WebSocket,
) {
    let group = chat_group(conversation.id);
    let (subscription_id, mut rx) = state.bus.join(&group).await;
    metrics::ws_connection_opened("chat");

    // Clear the joining party's unread count immediately on connect
    mark_read_and_broadcast(&state, &conversation, &user).await;

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
                Some(Ok(Message::Text(txt))) => {
                    handle_inbound(&state, &conversation, &user, &txt).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // binary and ping/pong frames carry no events
                Some(Err(_)) => break,
            },
        }
    }

    state.bus.leave(&group, subscription_id).await;
    metrics::ws_connection_closed("chat");
}

/// Inbound dispatch. Unrecognized event types and malformed payloads are
/// discarded; the connection stays open.
async fn handle_inbound(state: &AppState, conversation: &Conversation, user: &User, txt: &str) {
    match serde_json::from_str::<ChatInbound>(txt) {
        Ok(ChatInbound::ChatMessage { message, image_url }) => {
            if let Err(e) = send_chat_message(state, conversation, user, message, image_url).await {
                warn!(conversation_id = %conversation.id, error = %e, "failed to persist chat message");
            }
        }
        Ok(ChatInbound::MarkRead) => {
            mark_read_and_broadcast(state, conversation, user).await;
        }
        Ok(ChatInbound::Unrecognized) => {}
        Err(_) => {}
    }
}

/// Persist a message, broadcast it to the conversation group and notify the
/// counterpart. Shared by the WebSocket path and the HTTP fallback send.
pub async fn send_chat_message(
    state: &AppState,
    conversation: &Conversation,
    sender: &User,
    content: String,
    image_url: Option<String>,
) -> AppResult<ChatMessageRow> {
    let message = ChatService::create_message(
        &state.db,
        conversation.id,
        sender.id,
        &content,
        image_url.as_deref(),
    )
    .await?;

    let event = ChatOutbound::ChatMessage {
        message: message.content.clone(),
        message_id: message.id,
        sender: sender.username.clone(),
        sender_id: sender.id,
        sender_name: sender.display_name(),
        image_url: message.image_url.clone(),
        timestamp: message.created_at,
    };
    broadcast_json(state, &chat_group(conversation.id), &event).await;

    let counterpart = if sender.id == conversation.customer_id {
        conversation.provider_id
    } else {
        conversation.customer_id
    };
    NotificationService::notify(
        state,
        counterpart,
        "New message",
        &format!("{}: {}", sender.display_name(), message.content),
        kinds::NEW_MESSAGE,
        serde_json::json!({ "conversation_id": conversation.id }),
    )
    .await;

    Ok(message)
}

/// Mark-messages-read side effect plus the conversation-wide read receipt.
/// Failures are abandoned silently (fail-soft).
async fn mark_read_and_broadcast(state: &AppState, conversation: &Conversation, user: &User) {
    if let Err(e) = ChatService::mark_messages_read(&state.db, conversation.id, user.id).await {
        warn!(conversation_id = %conversation.id, error = %e, "mark-read side effect failed");
        return;
    }

    let event = ChatOutbound::MessagesRead {
        reader_id: user.id,
        reader_name: user.display_name(),
    };
    broadcast_json(state, &chat_group(conversation.id), &event).await;
}
