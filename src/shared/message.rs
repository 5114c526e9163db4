//! Chat Message Data Structures
//!
//! The canonical message model and the boundary payload used to create
//! one. Wire field names are camelCase to match the client contract.
//!
//! # Invariants
//!
//! - `delivered_at` is set iff `delivered` is true, and only once; the
//!   transition is monotonic (false to true, never back). Same for
//!   `seen`/`seen_at`.
//! - `seen == true` implies `delivered == true`. Seen presumes a
//!   successful delivery, so marking a message seen also stamps the
//!   delivery fields if they are still unset.
//! - Content is non-empty after trimming. Messages are never edited or
//!   deleted in this core; only the two flags move forward.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::conversation::conversation_id;
use super::error::ChatError;

/// A persisted chat message between two users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message ID
    pub id: Uuid,
    /// User who sent the message
    pub sender: Uuid,
    /// User the message is addressed to
    pub receiver: Uuid,
    /// Message content, non-empty after trim
    pub content: String,
    /// Server-assigned creation time; clients order by this, not by
    /// receipt order
    pub created_at: DateTime<Utc>,
    /// Whether the message reached any of the receiver's devices
    pub delivered: bool,
    /// When delivery was first acknowledged
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub delivered_at: Option<DateTime<Utc>>,
    /// Whether the receiver has seen the message
    pub seen: bool,
    /// When the message was first seen
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub seen_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Create a new unacknowledged message with a fresh id.
    pub fn new(sender: Uuid, receiver: Uuid, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            receiver,
            content: content.into(),
            created_at: Utc::now(),
            delivered: false,
            delivered_at: None,
            seen: false,
            seen_at: None,
        }
    }

    /// Derived identity of the conversation this message belongs to.
    pub fn conversation_id(&self) -> String {
        conversation_id(self.sender, self.receiver)
    }

    /// Stamp the delivery flag. Idempotent: a second call leaves
    /// `delivered_at` unchanged.
    pub fn mark_delivered(&mut self, at: DateTime<Utc>) {
        if !self.delivered {
            self.delivered = true;
            self.delivered_at = Some(at);
        }
    }

    /// Stamp the seen flag, and the delivery flag too if it is still
    /// unset (seen presumes delivery). Idempotent.
    pub fn mark_seen(&mut self, at: DateTime<Utc>) {
        self.mark_delivered(at);
        if !self.seen {
            self.seen = true;
            self.seen_at = Some(at);
        }
    }
}

/// Boundary payload for creating a message.
///
/// This is the single normalization pass for the loosely-shaped
/// payloads real clients send: the content field is also accepted under
/// its historical names (`text`, `body`, `message`). The permissiveness
/// stops here; everything past this struct works with [`Message`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewMessage {
    /// Optional server id: present when a client re-sends an
    /// already-persisted message for forwarding only.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<Uuid>,
    /// Claimed sender; must match the authenticated user when present.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sender: Option<Uuid>,
    pub receiver: Uuid,
    #[serde(alias = "text", alias = "body", alias = "message", default)]
    pub content: String,
}

impl NewMessage {
    pub fn new(receiver: Uuid, content: impl Into<String>) -> Self {
        Self {
            id: None,
            sender: None,
            receiver,
            content: content.into(),
        }
    }

    /// Trimmed content, or a validation error if nothing remains.
    pub fn normalized_content(&self) -> Result<String, ChatError> {
        let trimmed = self.content.trim();
        if trimmed.is_empty() {
            return Err(ChatError::validation("content", "must not be empty"));
        }
        Ok(trimmed.to_string())
    }
}
