//! Persisted board settings.
//!
//! Everything the board needs to come back up after a power cycle lives in
//! one versioned blob: broker credentials, machine identity, the snapshot of
//! undelivered messages, and the card cache for offline authentication. The
//! version stamp guards against reading a blob written by an incompatible
//! firmware.

use chrono::{DateTime, Utc};
use fabomatic_core::{CardUid, UserLevel};
use serde::{Deserialize, Serialize};

/// Version stamp of the settings layout.
pub(crate) const SETTINGS_MAGIC: u32 = 0x55AA;

/// One card remembered for offline authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedCard {
    pub uid: CardUid,
    pub level: UserLevel,
    pub name: String,
}

/// The persisted settings blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSettings {
    pub(crate) magic: u32,

    /// Broker hostname or address.
    pub broker_host: String,
    /// Broker username.
    pub broker_user: String,
    /// Broker password.
    pub broker_password: String,

    /// Machine name, used as the topic suffix.
    pub machine_name: String,
    /// Numeric machine identifier reported to the backend.
    pub machine_id: u16,

    /// Snapshot of undelivered messages, as written by the message buffer.
    #[serde(default)]
    pub message_buffer: Option<String>,
    /// Cards remembered for offline authentication, most recent first.
    #[serde(default)]
    pub card_cache: Vec<CachedCard>,

    /// When this blob was written.
    pub saved_at: DateTime<Utc>,
}

impl SavedSettings {
    /// Fresh settings for a machine, with empty runtime state.
    #[must_use]
    pub fn new(
        broker_host: impl Into<String>,
        broker_user: impl Into<String>,
        broker_password: impl Into<String>,
        machine_name: impl Into<String>,
        machine_id: u16,
    ) -> Self {
        Self {
            magic: SETTINGS_MAGIC,
            broker_host: broker_host.into(),
            broker_user: broker_user.into(),
            broker_password: broker_password.into(),
            machine_name: machine_name.into(),
            machine_id,
            message_buffer: None,
            card_cache: Vec::new(),
            saved_at: Utc::now(),
        }
    }

    /// Whether the version stamp matches this firmware.
    #[must_use]
    pub fn is_compatible(&self) -> bool {
        self.magic == SETTINGS_MAGIC
    }

    /// Refresh the write timestamp.
    pub fn touch(&mut self) {
        self.saved_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_settings_are_compatible() {
        let settings = SavedSettings::new("broker.local", "user", "pw", "laser1", 3);
        assert!(settings.is_compatible());
        assert!(settings.card_cache.is_empty());
        assert!(settings.message_buffer.is_none());
    }

    #[test]
    fn test_roundtrip_preserves_cache() {
        let mut settings = SavedSettings::new("broker.local", "user", "pw", "laser1", 3);
        settings.card_cache.push(CachedCard {
            uid: CardUid::new(0x1234),
            level: UserLevel::Staff,
            name: "Ada".into(),
        });
        let json = serde_json::to_string(&settings).unwrap();
        let restored: SavedSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, settings);
    }
}
