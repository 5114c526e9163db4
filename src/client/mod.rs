//! Client-side reconciliation core.
//!
//! Transport-free logic a chat client runs locally: an optimistic
//! message list converged by [`reconcile`], and an [`Outbox`] that
//! picks between the live connection and the HTTP fallback.
//!
//! [`reconcile`]: reconcile::reconcile
//! [`Outbox`]: outbox::Outbox

pub mod outbox;
pub mod reconcile;

pub use outbox::{Outbox, SendOutcome, SendTransport};
pub use reconcile::{reconcile, LocalMessage, LogEvent};
