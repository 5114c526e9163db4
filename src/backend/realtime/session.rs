//! Per-connection session state.
//!
//! One value per live connection, threaded explicitly through the
//! handlers. The state machine is one-way: `Connected
//! (unauthenticated)` -> `Authenticated` -> gone. An authenticated
//! connection is never demoted; logout closes the transport instead.

use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Session {
    pub conn_id: Uuid,
    /// None until the handshake or authenticate event succeeds.
    pub user_id: Option<Uuid>,
    pub joined_rooms: HashSet<String>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            conn_id: Uuid::new_v4(),
            user_id: None,
            joined_rooms: HashSet::new(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
