//! Message Store
//!
//! SQLite persistence for messages plus the two user presence columns
//! the registry flushes to (`online`, `last_seen`). Single source of
//! truth for message state; no other component caches it.
//!
//! # Ordering contract
//!
//! `conversation` returns ascending creation time with insertion-order
//! (rowid) tiebreak. Clients render top-to-bottom chronologically and
//! rely on this being stable for deduplication against live events.

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteConnectOptions, Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

use crate::shared::conversation::conversation_id;
use crate::shared::error::ChatError;
use crate::shared::message::Message;

#[derive(Clone, Debug)]
pub struct MessageStore {
    pool: SqlitePool,
}

impl MessageStore {
    /// Connect to the database at `url`, creating the file if missing.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        Ok(Self { pool })
    }

    /// Fresh in-memory database, used by tests.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        Self::connect("sqlite::memory:").await
    }

    /// Initialize the database schema.
    pub async fn init(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL,
                online INTEGER NOT NULL DEFAULT 0,
                last_seen TEXT
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL,
                sender TEXT NOT NULL,
                receiver TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                delivered INTEGER NOT NULL DEFAULT 0,
                delivered_at TEXT,
                seen INTEGER NOT NULL DEFAULT 0,
                seen_at TEXT
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation
                ON messages(conversation_id, created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Register a user row. Identity management is external; this
    /// exists so receiver validation and presence flags have a row to
    /// work against.
    pub async fn create_user(&self, id: Uuid, username: &str) -> Result<(), ChatError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, online)
            VALUES (?, ?, 0)
            ON CONFLICT(id) DO UPDATE SET username = excluded.username
            "#,
        )
        .bind(id.to_string())
        .bind(username)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn user_exists(&self, id: Uuid) -> Result<bool, ChatError> {
        let row = sqlx::query("SELECT 1 FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Persisted presence flags for a user, if the user exists.
    pub async fn user_presence(
        &self,
        id: Uuid,
    ) -> Result<Option<(bool, Option<DateTime<Utc>>)>, ChatError> {
        let row = sqlx::query("SELECT online, last_seen FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let online: bool = row.try_get("online").map_err(ChatError::from)?;
                let last_seen: Option<DateTime<Utc>> =
                    row.try_get("last_seen").map_err(ChatError::from)?;
                Ok(Some((online, last_seen)))
            }
            None => Ok(None),
        }
    }

    pub async fn set_online(&self, id: Uuid) -> Result<(), ChatError> {
        sqlx::query("UPDATE users SET online = 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_offline(&self, id: Uuid, last_seen: DateTime<Utc>) -> Result<(), ChatError> {
        sqlx::query("UPDATE users SET online = 0, last_seen = ? WHERE id = ?")
            .bind(last_seen)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Persist a new message. Rejects empty content (after trim) and
    /// unknown receivers; the sender is taken from the authenticated
    /// session and not re-validated here.
    pub async fn create(
        &self,
        sender: Uuid,
        receiver: Uuid,
        content: &str,
    ) -> Result<Message, ChatError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(ChatError::validation("content", "must not be empty"));
        }
        if !self.user_exists(receiver).await? {
            return Err(ChatError::not_found("receiver not found"));
        }

        let message = Message::new(sender, receiver, trimmed);
        sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, sender, receiver, content, created_at, delivered, seen)
            VALUES (?, ?, ?, ?, ?, ?, 0, 0)
            "#,
        )
        .bind(message.id.to_string())
        .bind(message.conversation_id())
        .bind(message.sender.to_string())
        .bind(message.receiver.to_string())
        .bind(&message.content)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        Ok(message)
    }

    /// Fetch a single message by id.
    pub async fn get(&self, id: Uuid) -> Result<Option<Message>, ChatError> {
        let row = sqlx::query(
            r#"
            SELECT id, sender, receiver, content, created_at,
                   delivered, delivered_at, seen, seen_at
            FROM messages WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_message).transpose()
    }

    /// Last `limit` messages between two users, in chronological order
    /// (oldest first). Fetches newest-first then reverses, so the limit
    /// trims history rather than the recent end.
    pub async fn conversation(
        &self,
        user_a: Uuid,
        user_b: Uuid,
        limit: u32,
    ) -> Result<Vec<Message>, ChatError> {
        let rows = sqlx::query(
            r#"
            SELECT id, sender, receiver, content, created_at,
                   delivered, delivered_at, seen, seen_at
            FROM messages
            WHERE conversation_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(conversation_id(user_a, user_b))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut messages = rows
            .into_iter()
            .map(row_to_message)
            .collect::<Result<Vec<_>, _>>()?;
        messages.reverse();
        Ok(messages)
    }

    /// Stamp the delivery flag. Idempotent: the stamp is only written
    /// while unset, so a repeat call never moves `delivered_at`.
    pub async fn mark_delivered(&self, id: Uuid) -> Result<Message, ChatError> {
        sqlx::query(
            r#"
            UPDATE messages
            SET delivered = 1, delivered_at = COALESCE(delivered_at, ?)
            WHERE id = ?
            "#,
        )
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        self.get(id)
            .await?
            .ok_or_else(|| ChatError::not_found("message not found"))
    }

    /// Stamp the seen flag, and the delivery flag too if still unset:
    /// a seen message was necessarily delivered. Idempotent.
    pub async fn mark_seen(&self, id: Uuid) -> Result<Message, ChatError> {
        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE messages
            SET seen = 1, seen_at = COALESCE(seen_at, ?),
                delivered = 1, delivered_at = COALESCE(delivered_at, ?)
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        self.get(id)
            .await?
            .ok_or_else(|| ChatError::not_found("message not found"))
    }
}

fn row_to_message(row: sqlx::sqlite::SqliteRow) -> Result<Message, ChatError> {
    let parse_uuid = |field: &str| -> Result<Uuid, ChatError> {
        let text: String = row.try_get(field).map_err(ChatError::from)?;
        Uuid::parse_str(&text)
            .map_err(|_| ChatError::transient(format!("corrupt uuid in column {}", field)))
    };

    Ok(Message {
        id: parse_uuid("id")?,
        sender: parse_uuid("sender")?,
        receiver: parse_uuid("receiver")?,
        content: row.try_get("content").map_err(ChatError::from)?,
        created_at: row.try_get("created_at").map_err(ChatError::from)?,
        delivered: row.try_get("delivered").map_err(ChatError::from)?,
        delivered_at: row.try_get("delivered_at").map_err(ChatError::from)?,
        seen: row.try_get("seen").map_err(ChatError::from)?,
        seen_at: row.try_get("seen_at").map_err(ChatError::from)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_users(users: &[Uuid]) -> MessageStore {
        let store = MessageStore::in_memory().await.unwrap();
        store.init().await.unwrap();
        for (i, id) in users.iter().enumerate() {
            store.create_user(*id, &format!("user{}", i)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_create_then_fetch_conversation() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let store = store_with_users(&[a, b]).await;

        let sent = store.create(a, b, "hello").await.unwrap();
        let messages = store.conversation(a, b, 50).await.unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0], sent);
        assert!(!messages[0].delivered);
        assert!(!messages[0].seen);
    }

    #[tokio::test]
    async fn test_create_rejects_empty_content() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let store = store_with_users(&[a, b]).await;

        let result = store.create(a, b, "   ").await;
        assert!(matches!(result, Err(ChatError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_receiver() {
        let a = Uuid::new_v4();
        let store = store_with_users(&[a]).await;

        let result = store.create(a, Uuid::new_v4(), "hello").await;
        assert!(matches!(result, Err(ChatError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_conversation_is_symmetric_and_chronological() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let store = store_with_users(&[a, b]).await;

        store.create(a, b, "one").await.unwrap();
        store.create(b, a, "two").await.unwrap();
        store.create(a, b, "three").await.unwrap();

        let from_a = store.conversation(a, b, 50).await.unwrap();
        let from_b = store.conversation(b, a, 50).await.unwrap();
        assert_eq!(from_a, from_b);

        let contents: Vec<&str> = from_a.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
        assert!(from_a.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[tokio::test]
    async fn test_conversation_limit_keeps_recent_end() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let store = store_with_users(&[a, b]).await;

        for i in 0..5 {
            store.create(a, b, &format!("msg-{}", i)).await.unwrap();
        }

        let messages = store.conversation(a, b, 2).await.unwrap();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["msg-3", "msg-4"]);
    }

    #[tokio::test]
    async fn test_mark_delivered_is_idempotent() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let store = store_with_users(&[a, b]).await;
        let sent = store.create(a, b, "hello").await.unwrap();

        let first = store.mark_delivered(sent.id).await.unwrap();
        assert!(first.delivered);
        let stamp = first.delivered_at.unwrap();

        let second = store.mark_delivered(sent.id).await.unwrap();
        assert_eq!(second.delivered_at, Some(stamp));
    }

    #[tokio::test]
    async fn test_mark_seen_implies_delivered() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let store = store_with_users(&[a, b]).await;
        let sent = store.create(a, b, "hello").await.unwrap();

        let seen = store.mark_seen(sent.id).await.unwrap();
        assert!(seen.seen);
        assert!(seen.delivered);
        assert!(seen.delivered_at.is_some());
        assert!(seen.seen_at.is_some());
    }

    #[tokio::test]
    async fn test_mark_seen_preserves_existing_delivery_stamp() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let store = store_with_users(&[a, b]).await;
        let sent = store.create(a, b, "hello").await.unwrap();

        let delivered = store.mark_delivered(sent.id).await.unwrap();
        let seen = store.mark_seen(sent.id).await.unwrap();
        assert_eq!(seen.delivered_at, delivered.delivered_at);
    }

    #[tokio::test]
    async fn test_mark_unknown_message_is_not_found() {
        let store = store_with_users(&[]).await;
        let result = store.mark_delivered(Uuid::new_v4()).await;
        assert!(matches!(result, Err(ChatError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_presence_flags_roundtrip() {
        let a = Uuid::new_v4();
        let store = store_with_users(&[a]).await;

        assert_eq!(store.user_presence(a).await.unwrap(), Some((false, None)));

        store.set_online(a).await.unwrap();
        assert_eq!(store.user_presence(a).await.unwrap(), Some((true, None)));

        let last_seen = Utc::now();
        store.set_offline(a, last_seen).await.unwrap();
        let (online, stamped) = store.user_presence(a).await.unwrap().unwrap();
        assert!(!online);
        assert_eq!(stamped, Some(last_seen));
    }

    #[tokio::test]
    async fn test_presence_for_unknown_user() {
        let store = store_with_users(&[]).await;
        assert_eq!(store.user_presence(Uuid::new_v4()).await.unwrap(), None);
    }
}
