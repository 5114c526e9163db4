//! Server-side code: the delivery protocol, presence registry, message
//! store and the axum wiring around them.

pub mod auth;
pub mod error;
pub mod messaging;
pub mod middleware;
pub mod notify;
pub mod presence;
pub mod realtime;
pub mod routes;
pub mod server;
