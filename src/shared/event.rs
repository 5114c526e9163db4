//! Wire Event Contract
//!
//! The bidirectional real-time protocol. Every frame is a JSON object
//! `{"event": <name>, "data": <payload>}`; event names and payload
//! shapes below are the wire contract and must not drift.
//!
//! Inbound (client to server) and outbound (server to client) events
//! are separate enums because the two directions share names but not
//! payloads: a client sends `typing {to}`, the relay arrives as
//! `typing {from}`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ChatError;
use super::message::{Message, NewMessage};
use super::presence::PresenceStatus;

/// Events a client may send over the live connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Bind this connection to a user via a credential token. The
    /// payload is the bare token string.
    Authenticate(String),
    /// Join a fan-out group; the payload is the bare room name.
    JoinRoom(String),
    /// Leave a fan-out group.
    LeaveRoom(String),
    /// Send (and persist) a message.
    SendMessage(NewMessage),
    /// Ephemeral typing indicator toward a user.
    Typing { to: Uuid },
    /// End of typing indicator.
    StopTyping { to: Uuid },
    /// Acknowledge delivery of a message; `to` is the original sender.
    #[serde(rename_all = "camelCase")]
    MessageDelivered { message_id: Uuid, to: Uuid },
    /// Acknowledge that a message was seen; `to` is the original sender.
    #[serde(rename_all = "camelCase")]
    MessageSeen { message_id: Uuid, to: Uuid },
    /// Pull the current presence of a user; the payload is the bare
    /// user id.
    GetPresence(Uuid),
    /// Client-initiated sign-out; the server treats this as a
    /// disconnect (an authenticated connection is never demoted).
    Logout,
}

/// Events the server may emit to a connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Presence transition or `getPresence` reply.
    UserStatus(PresenceStatus),
    /// A new or forwarded persisted message.
    ReceiveMessage(Message),
    /// Relayed typing indicator.
    Typing { from: Uuid },
    /// Relayed end-of-typing.
    StopTyping { from: Uuid },
    /// Relayed delivery acknowledgment.
    #[serde(rename_all = "camelCase")]
    MessageDelivered { message_id: Uuid },
    /// Relayed seen acknowledgment.
    #[serde(rename_all = "camelCase")]
    MessageSeen { message_id: Uuid },
    /// A failure scoped to this connection only.
    Error { code: String, message: String },
}

impl ServerEvent {
    /// Convert an error into its wire form. The taxonomy category
    /// travels as a stable code string.
    pub fn error(err: &ChatError) -> Self {
        Self::Error {
            code: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}
