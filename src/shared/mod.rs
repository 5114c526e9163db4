//! Types shared between the server and the client reconciliation core.

pub mod conversation;
pub mod error;
pub mod event;
pub mod message;
pub mod presence;

pub use conversation::{conversation_id, personal_room};
pub use error::ChatError;
pub use event::{ClientEvent, ServerEvent};
pub use message::{Message, NewMessage};
pub use presence::PresenceStatus;
