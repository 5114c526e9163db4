//! Server assembly: configuration, shared state, app construction and
//! background tasks.

pub mod config;
pub mod init;
pub mod state;

pub use config::ServerConfig;
pub use state::AppState;
