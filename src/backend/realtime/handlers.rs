//! Delivery Protocol Event Handlers
//!
//! One function per inbound event, driven by [`handle_event`]. The
//! transport (WebSocket read loop) stays protocol-agnostic: it parses
//! frames into [`ClientEvent`] values and feeds them here together with
//! the per-connection [`Session`].
//!
//! Failure scoping is the protocol's core rule: an error in handling
//! one event is reported to the offending connection as an `error`
//! event and never tears down the connection or leaks to other users.
//! Only `logout` (and transport close) ends a session.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::backend::presence::registry::{DeregisterOutcome, RegisterOutcome};
use crate::backend::server::AppState;
use crate::shared::conversation::personal_room;
use crate::shared::error::ChatError;
use crate::shared::event::{ClientEvent, ServerEvent};
use crate::shared::message::{Message, NewMessage};
use crate::shared::presence::PresenceStatus;

use super::session::Session;

/// What the transport loop should do after an event is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Continue,
    /// Close the connection (client asked to log out).
    Disconnect,
}

/// Dispatch one inbound event against the shared state.
pub async fn handle_event(
    state: &AppState,
    session: &mut Session,
    event: ClientEvent,
) -> EventOutcome {
    // Any inbound traffic from an authenticated connection counts as
    // activity for the staleness sweep.
    if let Some(user_id) = session.user_id {
        state.registry.touch(user_id);
    }

    match event {
        ClientEvent::Authenticate(token) => {
            handle_authenticate(state, session, &token).await;
        }
        ClientEvent::JoinRoom(room_id) => {
            if !session.is_authenticated() {
                reject(state, session, ChatError::auth("not authenticated"));
                return EventOutcome::Continue;
            }
            // Membership is unchecked beyond authentication: room names
            // are sorted id pairs, not secrets.
            state.hub.join(session.conn_id, &room_id);
            session.joined_rooms.insert(room_id);
        }
        ClientEvent::LeaveRoom(room_id) => {
            state.hub.leave(session.conn_id, &room_id);
            session.joined_rooms.remove(&room_id);
        }
        ClientEvent::SendMessage(draft) => {
            handle_send_message(state, session, draft).await;
        }
        ClientEvent::Typing { to } => {
            relay_typing(state, session, to, true);
        }
        ClientEvent::StopTyping { to } => {
            relay_typing(state, session, to, false);
        }
        ClientEvent::MessageDelivered { message_id, to } => {
            handle_ack(state, session, message_id, to, Ack::Delivered).await;
        }
        ClientEvent::MessageSeen { message_id, to } => {
            handle_ack(state, session, message_id, to, Ack::Seen).await;
        }
        ClientEvent::GetPresence(user_id) => {
            handle_get_presence(state, session, user_id).await;
        }
        ClientEvent::Logout => {
            tracing::info!(conn_id = %session.conn_id, "client logout");
            return EventOutcome::Disconnect;
        }
    }
    EventOutcome::Continue
}

/// Bind a connection to a user from a credential token.
///
/// Verification failure is reported to this connection only; the
/// connection stays open and unauthenticated, free to retry.
pub async fn handle_authenticate(state: &AppState, session: &mut Session, token: &str) {
    let user_id = match crate::backend::auth::verify_token(token) {
        Ok(user_id) => user_id,
        Err(err) => {
            tracing::warn!(conn_id = %session.conn_id, %err, "authentication failed");
            state.hub.emit_conn(session.conn_id, &ServerEvent::error(&err));
            return;
        }
    };

    session.user_id = Some(user_id);
    let room = personal_room(user_id);
    state.hub.join(session.conn_id, &room);
    session.joined_rooms.insert(room);

    match state.registry.register(user_id, session.conn_id) {
        RegisterOutcome::FirstConnection => {
            // Persistence is best effort: a failed flag write must not
            // undo the in-memory transition or block the broadcast.
            if let Err(err) = state.store.set_online(user_id).await {
                tracing::error!(%user_id, %err, "failed to persist online flag");
            }
            state
                .hub
                .emit_all(&ServerEvent::UserStatus(PresenceStatus::online(user_id)));
            tracing::info!(%user_id, conn_id = %session.conn_id, "user online");
        }
        RegisterOutcome::AlreadyOnline => {
            tracing::debug!(%user_id, conn_id = %session.conn_id, "additional device connected");
        }
    }
}

/// Persist and fan out a message, or forward an already-persisted one.
async fn handle_send_message(state: &AppState, session: &mut Session, draft: NewMessage) {
    let Some(sender) = session.user_id else {
        reject(state, session, ChatError::auth("not authenticated"));
        return;
    };
    if draft.sender.is_some_and(|claimed| claimed != sender) {
        reject(
            state,
            session,
            ChatError::validation("sender", "does not match the authenticated user"),
        );
        return;
    }

    // A payload carrying a server id is a forward of a message that was
    // already persisted over the REST path; skip the second insert.
    let message = if let Some(id) = draft.id {
        match state.store.get(id).await {
            Ok(Some(message)) if message.sender == sender => message,
            Ok(Some(_)) => {
                reject(
                    state,
                    session,
                    ChatError::validation("id", "message belongs to another sender"),
                );
                return;
            }
            Ok(None) => {
                reject(state, session, ChatError::not_found("message not found"));
                return;
            }
            Err(err) => {
                reject(state, session, err);
                return;
            }
        }
    } else {
        let content = match draft.normalized_content() {
            Ok(content) => content,
            Err(err) => {
                reject(state, session, err);
                return;
            }
        };
        match state.store.create(sender, draft.receiver, &content).await {
            Ok(message) => message,
            Err(err) => {
                reject(state, session, err);
                return;
            }
        }
    };

    fan_out_message(state, &message);
}

/// Emit a persisted message to both parties' personal rooms and hand
/// off to the notifier if the receiver has no live connection.
///
/// The sender's own room is included so their other devices converge
/// without a refetch; the originating device deduplicates by id.
pub fn fan_out_message(state: &AppState, message: &Message) {
    let event = ServerEvent::ReceiveMessage(message.clone());
    state.hub.emit_room(&personal_room(message.receiver), &event);
    state.hub.emit_room(&personal_room(message.sender), &event);

    if !state.registry.is_online(message.receiver) {
        state.notifier.notify_offline(message.receiver, message);
    }
}

fn relay_typing(state: &AppState, session: &Session, to: Uuid, started: bool) {
    // Ephemeral: no persistence, dropped when the target is offline.
    let Some(from) = session.user_id else {
        return;
    };
    let event = if started {
        ServerEvent::Typing { from }
    } else {
        ServerEvent::StopTyping { from }
    };
    state.hub.emit_room(&personal_room(to), &event);
}

#[derive(Debug, Clone, Copy)]
enum Ack {
    Delivered,
    Seen,
}

/// Persist an acknowledgment flag and relay the ack to the original
/// sender's personal room.
async fn handle_ack(state: &AppState, session: &Session, message_id: Uuid, to: Uuid, ack: Ack) {
    if session.user_id.is_none() {
        reject_conn(state, session.conn_id, ChatError::auth("not authenticated"));
        return;
    }

    let result = match ack {
        Ack::Delivered => state.store.mark_delivered(message_id).await,
        Ack::Seen => state.store.mark_seen(message_id).await,
    };
    if let Err(err) = result {
        reject_conn(state, session.conn_id, err);
        return;
    }

    let event = match ack {
        Ack::Delivered => ServerEvent::MessageDelivered { message_id },
        Ack::Seen => ServerEvent::MessageSeen { message_id },
    };
    state.hub.emit_room(&personal_room(to), &event);
}

/// Reply with the merged presence view of a user: live registry state
/// first, persisted flags as the fallback, and the later of the two
/// last-seen stamps.
async fn handle_get_presence(state: &AppState, session: &Session, user_id: Uuid) {
    let status = match resolve_presence(state, user_id).await {
        Ok(status) => status,
        Err(err) => {
            reject_conn(state, session.conn_id, err);
            return;
        }
    };
    state
        .hub
        .emit_conn(session.conn_id, &ServerEvent::UserStatus(status));
}

pub(crate) async fn resolve_presence(
    state: &AppState,
    user_id: Uuid,
) -> Result<PresenceStatus, ChatError> {
    if state.registry.is_online(user_id) {
        return Ok(PresenceStatus::online(user_id));
    }

    let persisted = state.store.user_presence(user_id).await?;
    let Some((online, persisted_last_seen)) = persisted else {
        return Err(ChatError::not_found("user not found"));
    };
    if online {
        // Covers the just-reconnected race where another process (or a
        // connection mid-handshake) holds the user online.
        return Ok(PresenceStatus::online(user_id));
    }

    let last_seen = latest(state.registry.last_activity(user_id), persisted_last_seen);
    Ok(PresenceStatus::offline(user_id, last_seen))
}

fn latest(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

/// Tear down a closed connection: drop its channels and, when it was
/// the user's last one, persist the offline transition and broadcast it.
pub async fn handle_disconnect(state: &AppState, session: &Session) {
    state.hub.unregister(session.conn_id);

    match state.registry.deregister(session.conn_id) {
        DeregisterOutcome::LastConnection { user_id, last_seen } => {
            if let Err(err) = state.store.set_offline(user_id, last_seen).await {
                tracing::error!(%user_id, %err, "failed to persist offline flag");
            }
            state.hub.emit_all(&ServerEvent::UserStatus(PresenceStatus::offline(
                user_id,
                Some(last_seen),
            )));
            tracing::info!(%user_id, conn_id = %session.conn_id, "user offline");
        }
        DeregisterOutcome::StillOnline { user_id } => {
            tracing::debug!(%user_id, conn_id = %session.conn_id, "device disconnected, user still online");
        }
        DeregisterOutcome::NotRegistered => {}
    }
}

/// Flush stale presence entries: persist and broadcast an offline
/// transition for every evicted user.
pub async fn sweep_stale_presence(state: &AppState, timeout: chrono::Duration) {
    for (user_id, last_seen) in state.registry.evict_stale(timeout) {
        tracing::info!(%user_id, "evicting stale presence entry");
        if let Err(err) = state.store.set_offline(user_id, last_seen).await {
            tracing::error!(%user_id, %err, "failed to persist offline flag");
        }
        state.hub.emit_all(&ServerEvent::UserStatus(PresenceStatus::offline(
            user_id,
            Some(last_seen),
        )));
    }
}

fn reject(state: &AppState, session: &Session, err: ChatError) {
    reject_conn(state, session.conn_id, err);
}

fn reject_conn(state: &AppState, conn_id: Uuid, err: ChatError) {
    tracing::debug!(%conn_id, %err, "rejecting client event");
    state.hub.emit_conn(conn_id, &ServerEvent::error(&err));
}
