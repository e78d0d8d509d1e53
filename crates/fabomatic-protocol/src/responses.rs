//! Typed replies received from the backend.
//!
//! Replies are JSON objects on the machine's reply sub-topic. Every reply
//! carries `request_ok`, which says whether the server handled the request;
//! domain answers (`is_valid`, `maintenance`, ...) are only meaningful when
//! `request_ok` is true.
//!
//! Parsing is deliberately forgiving: missing fields take their failure
//! defaults, and an unparseable payload maps to the same value as a denied
//! request. A garbled broker never produces a grant.

use fabomatic_core::{MachineType, UserLevel};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Common shape of every backend reply.
pub trait Response: Sized + for<'de> Deserialize<'de> {
    /// The value representing "request not handled".
    fn failed() -> Self;

    /// Whether the server handled the request.
    fn request_ok(&self) -> bool;

    /// Parse a reply payload, mapping any parse failure to [`Self::failed`].
    fn from_payload(payload: &str) -> Self {
        match serde_json::from_str(payload) {
            Ok(resp) => resp,
            Err(err) => {
                warn!(%err, payload, "unparseable backend reply");
                Self::failed()
            }
        }
    }
}

/// Reply to a user check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    #[serde(default)]
    pub request_ok: bool,
    /// Whether the card is authorized. A handled request with
    /// `is_valid == false` is an authoritative denial, not an error.
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub level: u8,
    #[serde(default)]
    pub name: String,
}

impl UserResponse {
    /// Privilege level, clamped to [`UserLevel::Unknown`] on bad codes.
    #[must_use]
    pub fn user_level(&self) -> UserLevel {
        UserLevel::from_u8(self.level).unwrap_or(UserLevel::Unknown)
    }
}

impl Response for UserResponse {
    fn failed() -> Self {
        Self::default()
    }

    fn request_ok(&self) -> bool {
        self.request_ok
    }
}

/// Reply to a machine policy check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineResponse {
    #[serde(default)]
    pub request_ok: bool,
    #[serde(default)]
    pub is_valid: bool,
    /// Machine is flagged for maintenance.
    #[serde(default)]
    pub maintenance: bool,
    /// Machine may be used at all.
    #[serde(default)]
    pub allowed: bool,
    /// Auto-logoff delay in minutes; 0 keeps the local default.
    #[serde(default)]
    pub logoff: u64,
    #[serde(rename = "type", default)]
    pub machine_type: u8,
    /// Grace period before power-off in minutes, when the server sets one.
    #[serde(default)]
    pub grace: Option<u64>,
    /// Human-readable machine name, when the server sets one.
    #[serde(default)]
    pub description: Option<String>,
}

impl MachineResponse {
    #[must_use]
    pub fn machine_type(&self) -> MachineType {
        MachineType::from_u8(self.machine_type)
    }
}

impl Default for MachineResponse {
    fn default() -> Self {
        Self {
            request_ok: false,
            is_valid: false,
            maintenance: true,
            allowed: false,
            logoff: 0,
            machine_type: 0,
            grace: None,
            description: None,
        }
    }
}

impl Response for MachineResponse {
    fn failed() -> Self {
        Self::default()
    }

    fn request_ok(&self) -> bool {
        self.request_ok
    }
}

/// Reply to record-only requests (start/stop/maintenance).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleResponse {
    #[serde(default)]
    pub request_ok: bool,
}

impl Response for SimpleResponse {
    fn failed() -> Self {
        Self::default()
    }

    fn request_ok(&self) -> bool {
        self.request_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_user_response_parse() {
        let resp = UserResponse::from_payload(
            r#"{"request_ok":true,"is_valid":true,"level":2,"name":"Ada"}"#,
        );
        assert!(resp.request_ok);
        assert!(resp.is_valid);
        assert_eq!(resp.user_level(), UserLevel::Staff);
        assert_eq!(resp.name, "Ada");
    }

    #[test]
    fn test_user_response_denial_is_not_failure() {
        let resp = UserResponse::from_payload(r#"{"request_ok":true,"is_valid":false}"#);
        assert!(resp.request_ok);
        assert!(!resp.is_valid);
    }

    #[rstest]
    #[case("not json at all")]
    #[case("")]
    #[case(r#"{"request_ok":"yes"}"#)]
    fn test_garbage_maps_to_failed(#[case] payload: &str) {
        let resp = UserResponse::from_payload(payload);
        assert_eq!(resp, UserResponse::failed());
        assert!(!resp.request_ok);
    }

    #[test]
    fn test_machine_response_parse() {
        let resp = MachineResponse::from_payload(
            r#"{"request_ok":true,"is_valid":true,"maintenance":false,"allowed":true,
               "logoff":480,"type":1,"grace":5,"description":"Prusa MK4"}"#,
        );
        assert!(resp.request_ok);
        assert!(resp.allowed);
        assert!(!resp.maintenance);
        assert_eq!(resp.logoff, 480);
        assert_eq!(resp.machine_type(), MachineType::Printer3D);
        assert_eq!(resp.grace, Some(5));
        assert_eq!(resp.description.as_deref(), Some("Prusa MK4"));
    }

    #[test]
    fn test_machine_response_failed_is_conservative() {
        // A failed policy fetch must read as blocked, not as open.
        let resp = MachineResponse::failed();
        assert!(!resp.allowed);
        assert!(resp.maintenance);
    }

    #[test]
    fn test_missing_fields_default() {
        let resp = MachineResponse::from_payload(r#"{"request_ok":true,"is_valid":true}"#);
        assert!(resp.request_ok);
        assert_eq!(resp.logoff, 0);
        assert_eq!(resp.grace, None);
    }

    #[test]
    fn test_simple_response() {
        let resp = SimpleResponse::from_payload(r#"{"request_ok":true}"#);
        assert!(resp.request_ok());
    }
}
