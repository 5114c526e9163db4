//! Environment-driven server configuration.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub database_url: String,
    /// How often the staleness sweep runs.
    pub sweep_interval: Duration,
    /// Idle time after which a connection is presumed dead.
    pub activity_timeout: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:ripple.db".to_string());
        let sweep_interval = env_millis("PRESENCE_SWEEP_INTERVAL_MS", 10_000);
        let activity_timeout = env_millis("PRESENCE_ACTIVITY_TIMEOUT_MS", 30_000);

        Self {
            port,
            database_url,
            sweep_interval,
            activity_timeout,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: "sqlite:ripple.db".to_string(),
            sweep_interval: Duration::from_millis(10_000),
            activity_timeout: Duration::from_millis(30_000),
        }
    }
}

fn env_millis(key: &str, default: u64) -> Duration {
    let millis = env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default);
    Duration::from_millis(millis)
}
