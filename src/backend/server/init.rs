//! Startup wiring: state construction and background tasks.

use axum::Router;
use chrono::Duration as ChronoDuration;

use crate::backend::messaging::MessageStore;
use crate::backend::realtime::handlers::sweep_stale_presence;
use crate::backend::routes::create_router;

use super::config::ServerConfig;
use super::state::AppState;

/// Connect to the database, run the schema, and build the shared state.
pub async fn build_state(config: ServerConfig) -> Result<AppState, sqlx::Error> {
    let store = MessageStore::connect(&config.database_url).await?;
    store.init().await?;
    Ok(AppState::new(store, config))
}

/// Build the full application router for the given state.
pub fn create_app(state: AppState) -> Router {
    create_router(state)
}

/// Spawn the periodic staleness sweep. Runs for the life of the
/// process; each tick evicts presence entries idle past the activity
/// timeout and broadcasts their offline transitions.
pub fn spawn_sweeper(state: AppState) -> tokio::task::JoinHandle<()> {
    let interval = state.config.sweep_interval;
    let timeout = ChronoDuration::from_std(state.config.activity_timeout)
        .unwrap_or_else(|_| ChronoDuration::seconds(30));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so a fresh boot
        // does not sweep an empty registry.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep_stale_presence(&state, timeout).await;
        }
    })
}
