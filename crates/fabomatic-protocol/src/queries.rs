//! Typed requests sent to the backend.
//!
//! Every request is one JSON object whose `action` field selects the
//! operation. Card UIDs travel as 8-digit uppercase hex strings.
//!
//! Two per-request properties drive the client's delivery discipline:
//!
//! - [`Query::wait_for_reply`]: whether the caller blocks for a reply on the
//!   machine's reply sub-topic.
//! - [`Query::bufferable`]: whether an undeliverable request is queued for
//!   retransmission after reconnect instead of being dropped. Only requests
//!   that record facts (usage start/stop, maintenance) are bufferable;
//!   questions (user/machine checks) are worthless once stale.

use fabomatic_core::CardUid;
use serde::{Deserialize, Serialize};

/// Serialize a [`CardUid`] as its wire hex string.
mod wire_uid {
    use fabomatic_core::CardUid;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(uid: &CardUid, ser: S) -> Result<S::Ok, S::Error> {
        uid.to_wire().serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<CardUid, D::Error> {
        let s = String::deserialize(de)?;
        CardUid::from_wire(&s).map_err(serde::de::Error::custom)
    }
}

/// A request to the backend authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Query {
    /// Ask whether a card is known and what privileges it carries.
    #[serde(rename = "checkuser")]
    CheckUser {
        #[serde(with = "wire_uid")]
        uid: CardUid,
    },

    /// Fetch the machine policy (maintenance, allowed, logoff, ...).
    #[serde(rename = "checkmachine")]
    CheckMachine,

    /// Record the start of a usage session.
    #[serde(rename = "startuse")]
    StartUse {
        #[serde(with = "wire_uid")]
        uid: CardUid,
    },

    /// Periodic notification that a session is still running, so usage
    /// data survives a mid-session reboot.
    #[serde(rename = "inuse")]
    InUse {
        #[serde(with = "wire_uid")]
        uid: CardUid,
        /// Accrued usage, in seconds.
        duration: u64,
    },

    /// Record the end of a usage session.
    #[serde(rename = "stopuse")]
    StopUse {
        #[serde(with = "wire_uid")]
        uid: CardUid,
        /// Total usage, in seconds.
        duration: u64,
    },

    /// Record a completed maintenance action.
    #[serde(rename = "maintenance")]
    Maintenance {
        #[serde(with = "wire_uid")]
        uid: CardUid,
    },

    /// Presence announcement with board identity.
    #[serde(rename = "alive")]
    Alive {
        version: String,
        ip: String,
        serial: String,
        heap: u64,
    },
}

impl Query {
    /// Whether the sender blocks for a server reply.
    #[must_use]
    pub fn wait_for_reply(&self) -> bool {
        !matches!(self, Query::Alive { .. })
    }

    /// Whether an undeliverable instance is queued for retransmission.
    #[must_use]
    pub fn bufferable(&self) -> bool {
        matches!(
            self,
            Query::StartUse { .. } | Query::StopUse { .. } | Query::Maintenance { .. }
        )
    }

    /// Encode as the JSON object published on the machine topic.
    ///
    /// # Errors
    /// Returns a `serde_json` error if encoding fails.
    pub fn payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
