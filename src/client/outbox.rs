//! Send Path Selection and Retry
//!
//! Realtime-first sending: when the live connection is up, the draft
//! goes over it and confirmation arrives as a `receiveMessage` echo.
//! When it is down, the HTTP fallback is used with bounded retries.
//! Only transient failures are retried; a validation or auth rejection
//! will fail identically on every attempt.

use std::time::Duration;

use crate::shared::error::ChatError;
use crate::shared::message::{Message, NewMessage};

/// Transport seam the outbox drives. Implemented over a real WebSocket
/// plus HTTP client pair in an application, and by fakes in tests.
pub trait SendTransport {
    /// Whether the live connection is currently usable.
    fn is_connected(&self) -> bool;

    /// Queue a draft on the live connection. Fire-and-forget; the
    /// persisted message comes back as a server event.
    fn send_realtime(&self, draft: &NewMessage) -> Result<(), ChatError>;

    /// Send over the HTTP fallback, returning the persisted message.
    fn send_http(
        &self,
        draft: &NewMessage,
    ) -> impl std::future::Future<Output = Result<Message, ChatError>> + Send;
}

/// How a send left the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Queued on the live connection; confirmation arrives as an event.
    Realtime,
    /// Persisted via HTTP; the message is the confirmation.
    Http(Message),
}

/// Bounded-retry sender over a [`SendTransport`].
#[derive(Debug, Clone)]
pub struct Outbox {
    max_attempts: u32,
    base_backoff: Duration,
}

impl Outbox {
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(500),
        }
    }

    #[cfg(test)]
    fn with_backoff(base_backoff: Duration) -> Self {
        Self {
            max_attempts: 3,
            base_backoff,
        }
    }

    /// Send a draft, preferring the live connection.
    ///
    /// If the realtime enqueue itself fails the draft falls through to
    /// HTTP rather than being dropped.
    pub async fn send<T: SendTransport>(
        &self,
        transport: &T,
        draft: &NewMessage,
    ) -> Result<SendOutcome, ChatError> {
        if transport.is_connected() {
            match transport.send_realtime(draft) {
                Ok(()) => return Ok(SendOutcome::Realtime),
                Err(err) => {
                    tracing::debug!(%err, "realtime enqueue failed, falling back to http");
                }
            }
        }
        self.send_http_with_retry(transport, draft).await
    }

    async fn send_http_with_retry<T: SendTransport>(
        &self,
        transport: &T,
        draft: &NewMessage,
    ) -> Result<SendOutcome, ChatError> {
        let mut backoff = self.base_backoff;
        let mut attempt = 1;
        loop {
            match transport.send_http(draft).await {
                Ok(message) => return Ok(SendOutcome::Http(message)),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    tracing::debug!(%err, attempt, "send failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for Outbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Scriptable transport fake.
    struct FakeTransport {
        connected: AtomicBool,
        realtime_sent: Mutex<Vec<NewMessage>>,
        http_attempts: AtomicU32,
        /// Number of leading HTTP attempts that fail transiently.
        http_failures: u32,
        http_error: fn() -> ChatError,
    }

    impl FakeTransport {
        fn new(connected: bool, http_failures: u32) -> Self {
            Self {
                connected: AtomicBool::new(connected),
                realtime_sent: Mutex::new(Vec::new()),
                http_attempts: AtomicU32::new(0),
                http_failures,
                http_error: || ChatError::transient("connection reset"),
            }
        }
    }

    impl SendTransport for FakeTransport {
        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        fn send_realtime(&self, draft: &NewMessage) -> Result<(), ChatError> {
            self.realtime_sent.lock().unwrap().push(draft.clone());
            Ok(())
        }

        async fn send_http(&self, draft: &NewMessage) -> Result<Message, ChatError> {
            let attempt = self.http_attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.http_failures {
                return Err((self.http_error)());
            }
            Ok(Message::new(Uuid::new_v4(), draft.receiver, &draft.content))
        }
    }

    fn draft() -> NewMessage {
        NewMessage::new(Uuid::new_v4(), "hello")
    }

    #[tokio::test]
    async fn test_connected_transport_uses_realtime() {
        let transport = FakeTransport::new(true, 0);
        let outcome = Outbox::new().send(&transport, &draft()).await.unwrap();

        assert_eq!(outcome, SendOutcome::Realtime);
        assert_eq!(transport.realtime_sent.lock().unwrap().len(), 1);
        assert_eq!(transport.http_attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_disconnected_transport_falls_back_to_http() {
        let transport = FakeTransport::new(false, 0);
        let outcome = Outbox::new().send(&transport, &draft()).await.unwrap();

        assert!(matches!(outcome, SendOutcome::Http(_)));
        assert!(transport.realtime_sent.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_http_failure_is_retried() {
        let transport = FakeTransport::new(false, 2);
        let outbox = Outbox::with_backoff(Duration::from_millis(10));

        let outcome = outbox.send(&transport, &draft()).await.unwrap();

        assert!(matches!(outcome, SendOutcome::Http(_)));
        assert_eq!(transport.http_attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_are_bounded() {
        let transport = FakeTransport::new(false, u32::MAX);
        let outbox = Outbox::with_backoff(Duration::from_millis(10));

        let result = outbox.send(&transport, &draft()).await;

        assert!(matches!(result, Err(ChatError::Transient { .. })));
        assert_eq!(transport.http_attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_failure_is_not_retried() {
        let mut transport = FakeTransport::new(false, u32::MAX);
        transport.http_error = || ChatError::validation("content", "must not be empty");

        let result = Outbox::new().send(&transport, &draft()).await;

        assert!(matches!(result, Err(ChatError::Validation { .. })));
        assert_eq!(transport.http_attempts.load(Ordering::SeqCst), 1);
    }
}
