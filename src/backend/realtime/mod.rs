//! The real-time delivery protocol: room fan-out, per-connection
//! session state and the event handlers behind the WebSocket endpoint.

pub mod handlers;
pub mod hub;
pub mod session;
pub mod ws;

pub use hub::Hub;
pub use session::Session;
