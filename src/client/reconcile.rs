//! Local Message List Reconciliation
//!
//! A client renders one message list per conversation and feeds every
//! source of truth through [`reconcile`]: optimistic local sends,
//! live `receiveMessage` events, acknowledgment relays and send
//! failures. The function is pure (list in, list out), so the same
//! logic backs the live view and the replay after a reconnect fetch.
//!
//! # Invariants
//!
//! - No duplicate ids: an event for an already-known message never adds
//!   a second entry.
//! - The list stays ordered by creation time, with arrival order
//!   breaking ties.
//! - A confirmed optimistic send is replaced in place, matched by
//!   (sender, receiver, content), so the bubble does not jump.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::shared::message::Message;

/// A message as the client renders it. `id` is a string because an
/// optimistic entry carries a `tmp-` placeholder until the server
/// assigns the real id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMessage {
    pub id: String,
    pub sender: Uuid,
    pub receiver: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub delivered: bool,
    pub seen: bool,
    /// True while the entry is an unconfirmed optimistic send.
    pub temp: bool,
}

impl LocalMessage {
    /// Optimistic entry for a send that has not been confirmed yet.
    pub fn optimistic(sender: Uuid, receiver: Uuid, content: impl Into<String>) -> Self {
        Self {
            id: format!("tmp-{}", Uuid::new_v4()),
            sender,
            receiver,
            content: content.into(),
            created_at: Utc::now(),
            delivered: false,
            seen: false,
            temp: true,
        }
    }
}

impl From<Message> for LocalMessage {
    fn from(message: Message) -> Self {
        Self {
            id: message.id.to_string(),
            sender: message.sender,
            receiver: message.receiver,
            content: message.content,
            created_at: message.created_at,
            delivered: message.delivered,
            seen: message.seen,
            temp: false,
        }
    }
}

/// One observed fact to fold into the local list.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    /// The user hit send; show the message immediately.
    LocalSend(LocalMessage),
    /// A persisted message arrived (live event or reconnect fetch).
    Received(Message),
    /// The send behind a temp entry failed for good; drop the bubble.
    SendFailed { temp_id: String },
    /// Delivery acknowledgment relay for a persisted message.
    Delivered { message_id: Uuid },
    /// Seen acknowledgment relay for a persisted message.
    Seen { message_id: Uuid },
}

/// Fold one event into the message list.
pub fn reconcile(mut list: Vec<LocalMessage>, event: &LogEvent) -> Vec<LocalMessage> {
    match event {
        LogEvent::LocalSend(message) => {
            if !list.iter().any(|m| m.id == message.id) {
                insert_ordered(&mut list, message.clone());
            }
        }
        LogEvent::Received(message) => {
            let id = message.id.to_string();
            if let Some(existing) = list.iter_mut().find(|m| m.id == id) {
                // Already known (echo of our own fan-out, or a replayed
                // fetch); only the flags can have moved forward.
                existing.delivered |= message.delivered;
                existing.seen |= message.seen;
                return list;
            }
            // Confirmation of an optimistic send: swap it in place.
            if let Some(temp) = list.iter_mut().find(|m| {
                m.temp
                    && m.sender == message.sender
                    && m.receiver == message.receiver
                    && m.content == message.content
            }) {
                *temp = LocalMessage::from(message.clone());
                return list;
            }
            insert_ordered(&mut list, LocalMessage::from(message.clone()));
        }
        LogEvent::SendFailed { temp_id } => {
            list.retain(|m| !(m.temp && &m.id == temp_id));
        }
        LogEvent::Delivered { message_id } => {
            let id = message_id.to_string();
            if let Some(message) = list.iter_mut().find(|m| m.id == id) {
                message.delivered = true;
            }
        }
        LogEvent::Seen { message_id } => {
            let id = message_id.to_string();
            if let Some(message) = list.iter_mut().find(|m| m.id == id) {
                message.seen = true;
                message.delivered = true;
            }
        }
    }
    list
}

/// Insert keeping creation-time order; equal stamps keep arrival order.
fn insert_ordered(list: &mut Vec<LocalMessage>, message: LocalMessage) {
    let position = list
        .iter()
        .rposition(|m| m.created_at <= message.created_at)
        .map(|i| i + 1)
        .unwrap_or(0);
    list.insert(position, message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn persisted(sender: Uuid, receiver: Uuid, content: &str) -> Message {
        Message::new(sender, receiver, content)
    }

    #[test]
    fn test_local_send_appends_temp_entry() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let temp = LocalMessage::optimistic(a, b, "hello");
        assert!(temp.id.starts_with("tmp-"));

        let list = reconcile(Vec::new(), &LogEvent::LocalSend(temp.clone()));
        assert_eq!(list, vec![temp]);
    }

    #[test]
    fn test_confirmation_replaces_temp_in_place() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let older: LocalMessage = persisted(b, a, "earlier").into();
        let temp = LocalMessage::optimistic(a, b, "hello");
        let list = vec![older.clone(), temp.clone()];

        let confirmed = persisted(a, b, "hello");
        let list = reconcile(list, &LogEvent::Received(confirmed.clone()));

        assert_eq!(list.len(), 2);
        assert_eq!(list[0], older);
        assert_eq!(list[1].id, confirmed.id.to_string());
        assert!(!list[1].temp);
    }

    #[test]
    fn test_duplicate_receive_is_ignored() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let message = persisted(a, b, "hello");
        let list = reconcile(Vec::new(), &LogEvent::Received(message.clone()));
        let list = reconcile(list, &LogEvent::Received(message));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_replayed_fetch_advances_flags_on_known_message() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut message = persisted(a, b, "hello");
        let list = reconcile(Vec::new(), &LogEvent::Received(message.clone()));

        // The fetch after reconnect carries the same message, now seen.
        message.mark_seen(Utc::now());
        let list = reconcile(list, &LogEvent::Received(message));
        assert_eq!(list.len(), 1);
        assert!(list[0].seen && list[0].delivered);
    }

    #[test]
    fn test_out_of_order_arrival_sorts_by_creation_time() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut first = persisted(a, b, "first");
        let mut second = persisted(a, b, "second");
        first.created_at = Utc::now() - Duration::seconds(10);
        second.created_at = Utc::now();

        // Arrive newest first.
        let list = reconcile(Vec::new(), &LogEvent::Received(second));
        let list = reconcile(list, &LogEvent::Received(first));

        let contents: Vec<&str> = list.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[test]
    fn test_send_failed_removes_only_the_temp_entry() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let kept: LocalMessage = persisted(b, a, "kept").into();
        let temp = LocalMessage::optimistic(a, b, "doomed");
        let list = vec![kept.clone(), temp.clone()];

        let list = reconcile(list, &LogEvent::SendFailed { temp_id: temp.id });
        assert_eq!(list, vec![kept]);
    }

    #[test]
    fn test_send_failed_never_removes_confirmed_messages() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let confirmed: LocalMessage = persisted(a, b, "safe").into();
        let id = confirmed.id.clone();
        let list = vec![confirmed.clone()];

        let list = reconcile(list, &LogEvent::SendFailed { temp_id: id });
        assert_eq!(list, vec![confirmed]);
    }

    #[test]
    fn test_seen_ack_implies_delivered() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let message = persisted(a, b, "hello");
        let id = message.id;
        let list = reconcile(Vec::new(), &LogEvent::Received(message));
        let list = reconcile(list, &LogEvent::Seen { message_id: id });
        assert!(list[0].seen);
        assert!(list[0].delivered);
    }

    #[test]
    fn test_ack_for_unknown_message_is_a_noop() {
        let list = reconcile(
            Vec::new(),
            &LogEvent::Delivered {
                message_id: Uuid::new_v4(),
            },
        );
        assert!(list.is_empty());
    }

    proptest! {
        /// Applying the same Received event twice never changes the
        /// result of applying it once.
        #[test]
        fn prop_received_is_idempotent(contents in proptest::collection::vec("[a-z]{1,8}", 1..10)) {
            let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
            let events: Vec<LogEvent> = contents
                .iter()
                .map(|c| LogEvent::Received(persisted(a, b, c)))
                .collect();

            let mut once = Vec::new();
            let mut twice = Vec::new();
            for event in &events {
                once = reconcile(once, event);
                twice = reconcile(twice, event);
                twice = reconcile(twice, event);
            }
            prop_assert_eq!(once, twice);
        }

        /// The list stays creation-time ordered regardless of arrival
        /// order.
        #[test]
        fn prop_list_stays_ordered(offsets in proptest::collection::vec(-300i64..300, 1..12)) {
            let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
            let mut list = Vec::new();
            for (i, offset) in offsets.iter().enumerate() {
                let mut message = persisted(a, b, &format!("m{}", i));
                message.created_at = Utc::now() + Duration::seconds(*offset);
                list = reconcile(list, &LogEvent::Received(message));
            }
            prop_assert!(list.windows(2).all(|w| w[0].created_at <= w[1].created_at));
        }
    }
}
