//! Fan-out Hub
//!
//! Maps rooms to subscribed connections and connections to their
//! outbound channels. Emitting is fire-and-forget: a closed or
//! congested receiver drops the event at the transport layer, which is
//! the contract for offline fan-out targets.
//!
//! All maps live under one std `Mutex` and no lock is held across an
//! await, so join/leave/emit are atomic with respect to each other.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::shared::event::ServerEvent;

pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

#[derive(Debug, Default)]
struct Inner {
    senders: HashMap<Uuid, EventSender>,
    rooms: HashMap<String, HashSet<Uuid>>,
    memberships: HashMap<Uuid, HashSet<String>>,
}

/// Room membership + outbound channels for every live connection.
#[derive(Debug, Default)]
pub struct Hub {
    inner: Mutex<Inner>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a connection's outbound channel. Must be called before
    /// the connection can join rooms or receive emits.
    pub fn register(&self, conn_id: Uuid, sender: EventSender) {
        let mut inner = self.inner.lock().expect("hub poisoned");
        inner.senders.insert(conn_id, sender);
    }

    /// Drop a connection and its room memberships.
    pub fn unregister(&self, conn_id: Uuid) {
        let mut inner = self.inner.lock().expect("hub poisoned");
        inner.senders.remove(&conn_id);
        if let Some(rooms) = inner.memberships.remove(&conn_id) {
            for room in rooms {
                if let Some(members) = inner.rooms.get_mut(&room) {
                    members.remove(&conn_id);
                    if members.is_empty() {
                        inner.rooms.remove(&room);
                    }
                }
            }
        }
    }

    /// Purely additive membership; any registered connection may join
    /// any room name.
    pub fn join(&self, conn_id: Uuid, room: &str) {
        let mut inner = self.inner.lock().expect("hub poisoned");
        if !inner.senders.contains_key(&conn_id) {
            return;
        }
        inner
            .rooms
            .entry(room.to_string())
            .or_default()
            .insert(conn_id);
        inner
            .memberships
            .entry(conn_id)
            .or_default()
            .insert(room.to_string());
    }

    pub fn leave(&self, conn_id: Uuid, room: &str) {
        let mut inner = self.inner.lock().expect("hub poisoned");
        if let Some(members) = inner.rooms.get_mut(room) {
            members.remove(&conn_id);
            if members.is_empty() {
                inner.rooms.remove(room);
            }
        }
        if let Some(rooms) = inner.memberships.get_mut(&conn_id) {
            rooms.remove(room);
        }
    }

    /// Emit to every connection subscribed to a room.
    pub fn emit_room(&self, room: &str, event: &ServerEvent) {
        let inner = self.inner.lock().expect("hub poisoned");
        if let Some(members) = inner.rooms.get(room) {
            for conn_id in members {
                if let Some(sender) = inner.senders.get(conn_id) {
                    let _ = sender.send(event.clone());
                }
            }
        }
    }

    /// Emit to every live connection (presence broadcasts).
    pub fn emit_all(&self, event: &ServerEvent) {
        let inner = self.inner.lock().expect("hub poisoned");
        for sender in inner.senders.values() {
            let _ = sender.send(event.clone());
        }
    }

    /// Emit to a single connection (errors, getPresence replies).
    pub fn emit_conn(&self, conn_id: Uuid, event: &ServerEvent) {
        let inner = self.inner.lock().expect("hub poisoned");
        if let Some(sender) = inner.senders.get(&conn_id) {
            let _ = sender.send(event.clone());
        }
    }

    pub fn room_size(&self, room: &str) -> usize {
        let inner = self.inner.lock().expect("hub poisoned");
        inner.rooms.get(room).map(|m| m.len()).unwrap_or(0)
    }

    pub fn connection_count(&self) -> usize {
        let inner = self.inner.lock().expect("hub poisoned");
        inner.senders.len()
    }
}
