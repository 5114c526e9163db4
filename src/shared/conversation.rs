//! Conversation and Room Identity
//!
//! A private two-party conversation is addressed by a derived identity,
//! not a stored aggregate: the sorted pair of participant ids joined
//! with an underscore. The identity is symmetric and stable regardless
//! of who initiates.

use uuid::Uuid;

/// Deterministic conversation id for a pair of users.
///
/// `conversation_id(a, b) == conversation_id(b, a)` for all pairs.
pub fn conversation_id(a: Uuid, b: Uuid) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{}_{}", lo, hi)
}

/// Name of a user's personal fan-out room. Every authenticated
/// connection of a user joins this room, so emitting here reaches all
/// of their devices.
pub fn personal_room(user_id: Uuid) -> String {
    format!("user_{}", user_id)
}
