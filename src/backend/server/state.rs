//! Shared application state threaded through every handler.

use std::sync::Arc;

use crate::backend::messaging::MessageStore;
use crate::backend::notify::{LogNotifier, Notifier};
use crate::backend::presence::PresenceRegistry;
use crate::backend::realtime::hub::Hub;

use super::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub store: MessageStore,
    pub registry: Arc<PresenceRegistry>,
    pub hub: Arc<Hub>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(store: MessageStore, config: ServerConfig) -> Self {
        Self {
            store,
            registry: Arc::new(PresenceRegistry::new()),
            hub: Arc::new(Hub::new()),
            notifier: Arc::new(LogNotifier),
            config: Arc::new(config),
        }
    }

    /// Swap the notification port, used by tests to observe hand-offs.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}
