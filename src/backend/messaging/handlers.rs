//! REST handlers for the message store.
//!
//! The HTTP path is the fallback and backfill surface: sending works
//! here when the live connection is down, and conversation fetches are
//! how clients reconcile after a reconnect. A message posted over HTTP
//! still fans out over the live connections, so an online receiver sees
//! it without polling.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::backend::error::ApiError;
use crate::backend::middleware::auth::AuthUser;
use crate::backend::realtime::handlers::{fan_out_message, resolve_presence};
use crate::backend::server::AppState;
use crate::shared::conversation::personal_room;
use crate::shared::error::ChatError;
use crate::shared::event::ServerEvent;
use crate::shared::message::{Message, NewMessage};
use crate::shared::presence::PresenceStatus;

const DEFAULT_CONVERSATION_LIMIT: u32 = 50;
const MAX_CONVERSATION_LIMIT: u32 = 200;

/// POST /api/messages
pub async fn post_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(draft): Json<NewMessage>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    if draft.sender.is_some_and(|claimed| claimed != user.user_id) {
        return Err(ChatError::validation("sender", "does not match the authenticated user").into());
    }
    let content = draft.normalized_content()?;
    let message = state.store.create(user.user_id, draft.receiver, &content).await?;

    fan_out_message(&state, &message);

    Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    pub limit: Option<u32>,
}

/// GET /api/messages/{other_user_id}
pub async fn get_conversation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(other_user_id): Path<Uuid>,
    Query(query): Query<ConversationQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_CONVERSATION_LIMIT)
        .min(MAX_CONVERSATION_LIMIT);
    let messages = state
        .store
        .conversation(user.user_id, other_user_id, limit)
        .await?;
    Ok(Json(messages))
}

/// PATCH /api/messages/{id}/delivered
pub async fn patch_delivered(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(message_id): Path<Uuid>,
) -> Result<Json<Message>, ApiError> {
    let message = ack_message(&state, user.user_id, message_id, Ack::Delivered).await?;
    Ok(Json(message))
}

/// PATCH /api/messages/{id}/seen
pub async fn patch_seen(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(message_id): Path<Uuid>,
) -> Result<Json<Message>, ApiError> {
    let message = ack_message(&state, user.user_id, message_id, Ack::Seen).await?;
    Ok(Json(message))
}

/// GET /api/presence/{user_id}
pub async fn get_presence(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<PresenceStatus>, ApiError> {
    let status = resolve_presence(&state, user_id).await?;
    Ok(Json(status))
}

#[derive(Debug, Clone, Copy)]
enum Ack {
    Delivered,
    Seen,
}

/// Persist an acknowledgment and relay it to the sender's personal
/// room. Only the addressed receiver may acknowledge a message.
async fn ack_message(
    state: &AppState,
    caller: Uuid,
    message_id: Uuid,
    ack: Ack,
) -> Result<Message, ChatError> {
    let message = state
        .store
        .get(message_id)
        .await?
        .ok_or_else(|| ChatError::not_found("message not found"))?;
    if message.receiver != caller {
        return Err(ChatError::validation(
            "messageId",
            "only the receiver may acknowledge a message",
        ));
    }

    let (updated, event) = match ack {
        Ack::Delivered => (
            state.store.mark_delivered(message_id).await?,
            ServerEvent::MessageDelivered { message_id },
        ),
        Ack::Seen => (
            state.store.mark_seen(message_id).await?,
            ServerEvent::MessageSeen { message_id },
        ),
    };
    state.hub.emit_room(&personal_room(message.sender), &event);
    Ok(updated)
}
