use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::guards::{ChatParticipant, CurrentUser};
use crate::models::{chat::Conversation, Message};
use crate::services::auth_service::AuthService;
use crate::services::chat_service::{ChatService, MessageWithSender};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
    pub image_url: Option<String>,
}

pub async fn list_conversations(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<Conversation>>> {
    let conversations = ChatService::list_conversations_for_user(&state.db, current.id).await?;
    Ok(Json(conversations))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(conversation_id): Path<Uuid>,
) -> AppResult<Json<Conversation>> {
    ChatParticipant::verify(&state.db, current.id, conversation_id).await?;
    let conversation = ChatService::get_conversation(&state.db, conversation_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(conversation))
}

pub async fn list_messages(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(conversation_id): Path<Uuid>,
) -> AppResult<Json<Vec<MessageWithSender>>> {
    ChatParticipant::verify(&state.db, current.id, conversation_id).await?;
    let messages = ChatService::list_messages(&state.db, conversation_id).await?;
    Ok(Json(messages))
}

/// HTTP fallback for sending. Persists, broadcasts and notifies exactly like
/// the WebSocket path.
pub async fn send_message(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(conversation_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<Message>)> {
    if req.message.trim().is_empty() {
        return Err(AppError::BadRequest("message is required".into()));
    }
    ChatParticipant::verify(&state.db, current.id, conversation_id).await?;

    let conversation = ChatService::get_conversation(&state.db, conversation_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let sender = AuthService::get_user(&state.db, current.id).await?;

    let message = crate::websocket::chat::send_chat_message(
        &state,
        &conversation,
        &sender,
        req.message,
        req.image_url,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(message)))
}
