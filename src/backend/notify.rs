//! Best-effort offline notification hand-off.
//!
//! When a fan-out target has no live connection, the delivery protocol
//! hands the message to this port so an out-of-band notification can be
//! queued. The call returns `()`: its failures live on their own
//! channel (logs) and cannot affect the outcome of message persistence.

use uuid::Uuid;

use crate::shared::message::Message;

/// Fire-and-forget notification port.
pub trait Notifier: Send + Sync {
    fn notify_offline(&self, receiver: Uuid, message: &Message);
}

/// Default notifier: records the hand-off in the log and nothing else.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_offline(&self, receiver: Uuid, message: &Message) {
        tracing::debug!(
            %receiver,
            message_id = %message.id,
            "receiver offline, handing off for out-of-band notification"
        );
    }
}
