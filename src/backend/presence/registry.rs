//! Presence Registry
//!
//! Authoritative in-memory record of which users are currently
//! reachable over real-time connections. A user is online while they
//! have at least one registered connection; the entry disappears when
//! the last connection goes away.
//!
//! The registry is deliberately pure bookkeeping: operations return a
//! transition outcome (first connection, last connection, no change)
//! and the caller performs the persistence write and the presence
//! broadcast on that transition. Nothing here does I/O, so every
//! mutation happens atomically under one lock with no await in between.
//! That is what makes the "two connections authenticate, one
//! disconnects" race safe: the surviving connection keeps the entry
//! non-empty and deregistration reports `StillOnline`.
//!
//! Half-open connections (a phone backgrounded without a clean close)
//! never fire a disconnect, so presence would otherwise stick online
//! forever. The periodic staleness sweep calls [`evict_stale`] to force
//! out entries whose last activity exceeded the timeout.
//!
//! [`evict_stale`]: PresenceRegistry::evict_stale

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

/// Result of registering a connection for a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// First active connection for this user; caller should mark the
    /// user online and broadcast a presence-online event.
    FirstConnection,
    /// The user already had other connections; no broadcast needed.
    AlreadyOnline,
}

/// Result of deregistering a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeregisterOutcome {
    /// The connection set became empty; caller should mark the user
    /// offline with `last_seen` and broadcast a presence-offline event.
    LastConnection {
        user_id: Uuid,
        last_seen: DateTime<Utc>,
    },
    /// Other connections remain for the user; no transition.
    StillOnline { user_id: Uuid },
    /// The connection was never registered (unauthenticated, or
    /// already force-evicted by the staleness sweep).
    NotRegistered,
}

#[derive(Debug)]
struct Entry {
    connections: HashSet<Uuid>,
    last_activity: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    /// user -> active connections + last inbound activity
    users: HashMap<Uuid, Entry>,
    /// connection -> owning user, for deregistration by conn id
    conn_user: HashMap<Uuid, Uuid>,
}

/// Process-wide presence state. Reset on restart: every user appears
/// offline until they reconnect.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    inner: Mutex<Inner>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an authenticated connection under a user.
    pub fn register(&self, user_id: Uuid, conn_id: Uuid) -> RegisterOutcome {
        let mut inner = self.inner.lock().expect("presence registry poisoned");
        inner.conn_user.insert(conn_id, user_id);
        let entry = inner.users.entry(user_id).or_insert_with(|| Entry {
            connections: HashSet::new(),
            last_activity: Utc::now(),
        });
        let was_empty = entry.connections.is_empty();
        entry.connections.insert(conn_id);
        entry.last_activity = Utc::now();
        if was_empty {
            RegisterOutcome::FirstConnection
        } else {
            RegisterOutcome::AlreadyOnline
        }
    }

    /// Remove a connection from its user's entry.
    pub fn deregister(&self, conn_id: Uuid) -> DeregisterOutcome {
        let mut inner = self.inner.lock().expect("presence registry poisoned");
        let Some(user_id) = inner.conn_user.remove(&conn_id) else {
            return DeregisterOutcome::NotRegistered;
        };
        let Some(entry) = inner.users.get_mut(&user_id) else {
            return DeregisterOutcome::NotRegistered;
        };
        if !entry.connections.remove(&conn_id) {
            return DeregisterOutcome::NotRegistered;
        }
        if entry.connections.is_empty() {
            inner.users.remove(&user_id);
            DeregisterOutcome::LastConnection {
                user_id,
                last_seen: Utc::now(),
            }
        } else {
            DeregisterOutcome::StillOnline { user_id }
        }
    }

    /// Record inbound activity for a user. Called on every event from
    /// an authenticated connection so the staleness sweep sees live
    /// connections as live.
    pub fn touch(&self, user_id: Uuid) {
        let mut inner = self.inner.lock().expect("presence registry poisoned");
        if let Some(entry) = inner.users.get_mut(&user_id) {
            entry.last_activity = Utc::now();
        }
    }

    /// Whether the registry currently holds any connection for a user.
    pub fn is_online(&self, user_id: Uuid) -> bool {
        let inner = self.inner.lock().expect("presence registry poisoned");
        inner
            .users
            .get(&user_id)
            .map(|e| !e.connections.is_empty())
            .unwrap_or(false)
    }

    /// Last known inbound activity for a user, if still registered.
    pub fn last_activity(&self, user_id: Uuid) -> Option<DateTime<Utc>> {
        let inner = self.inner.lock().expect("presence registry poisoned");
        inner.users.get(&user_id).map(|e| e.last_activity)
    }

    /// Number of active connections for a user.
    pub fn connection_count(&self, user_id: Uuid) -> usize {
        let inner = self.inner.lock().expect("presence registry poisoned");
        inner
            .users
            .get(&user_id)
            .map(|e| e.connections.len())
            .unwrap_or(0)
    }

    /// Force-evict every entry whose last activity is older than
    /// `timeout`. Returns the evicted users with the last-seen stamp
    /// the caller should persist and broadcast.
    pub fn evict_stale(&self, timeout: Duration) -> Vec<(Uuid, DateTime<Utc>)> {
        let cutoff = Utc::now() - timeout;
        let mut inner = self.inner.lock().expect("presence registry poisoned");
        let stale: Vec<Uuid> = inner
            .users
            .iter()
            .filter(|(_, entry)| entry.last_activity < cutoff)
            .map(|(user_id, _)| *user_id)
            .collect();

        let mut evicted = Vec::with_capacity(stale.len());
        for user_id in stale {
            if let Some(entry) = inner.users.remove(&user_id) {
                for conn_id in &entry.connections {
                    inner.conn_user.remove(conn_id);
                }
                evicted.push((user_id, entry.last_activity));
            }
        }
        evicted
    }
}
