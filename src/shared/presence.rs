//! Presence status DTO shared by the `userStatus` event, the registry
//! and the persisted user flags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's current reachability as reported to clients.
///
/// `last_seen` is only meaningful when `online` is false; it is the
/// later of the registry's last-known activity and the persisted stamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceStatus {
    pub user_id: Uuid,
    pub online: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_seen: Option<DateTime<Utc>>,
}

impl PresenceStatus {
    pub fn online(user_id: Uuid) -> Self {
        Self {
            user_id,
            online: true,
            last_seen: None,
        }
    }

    pub fn offline(user_id: Uuid, last_seen: Option<DateTime<Utc>>) -> Self {
        Self {
            user_id,
            online: false,
            last_seen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_online_status_has_no_last_seen() {
        let s = PresenceStatus::online(Uuid::new_v4());
        assert!(s.online);
        assert!(s.last_seen.is_none());
    }

    #[test]
    fn test_wire_shape() {
        let s = PresenceStatus::offline(Uuid::new_v4(), Some(Utc::now()));
        let json = serde_json::to_value(&s).unwrap();
        assert!(json.get("userId").is_some());
        assert!(json.get("lastSeen").is_some());
        assert_eq!(json.get("online").unwrap(), false);
    }
}
