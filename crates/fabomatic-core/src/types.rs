use crate::{Result, constants::UID_BYTE_LEN, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// RFID card unique identifier (vendor UID).
///
/// The reader delivers 4 bytes; they are packed little-endian (byte 0 is the
/// least significant) into an integer. `CardUid::INVALID` (all zeros) marks
/// "no card" and never authenticates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardUid(u64);

impl CardUid {
    /// The null UID, used as a sentinel for "no card present".
    pub const INVALID: CardUid = CardUid(0);

    /// Wrap a raw UID value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        CardUid(raw)
    }

    /// Pack the reader's UID bytes (byte 0 least significant).
    #[must_use]
    pub const fn from_bytes(bytes: [u8; UID_BYTE_LEN]) -> Self {
        let mut result: u64 = 0;
        let mut i = UID_BYTE_LEN;
        while i > 0 {
            i -= 1;
            result <<= 8;
            result |= bytes[i] as u64;
        }
        CardUid(result)
    }

    /// Unpack into the reader's byte order.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; UID_BYTE_LEN] {
        let mut out = [0u8; UID_BYTE_LEN];
        let mut i = 0;
        while i < UID_BYTE_LEN {
            out[i] = ((self.0 >> (i * 8)) & 0xFF) as u8;
            i += 1;
        }
        out
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns `true` for the null sentinel.
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        self.0 == 0
    }

    /// Wire representation: 8 uppercase hex digits of the low 32 bits,
    /// matching what the backend expects in the `uid` field.
    #[must_use]
    pub fn to_wire(self) -> String {
        format!("{:08X}", self.0 as u32)
    }

    /// Parse the wire representation produced by [`CardUid::to_wire`].
    ///
    /// # Errors
    /// Returns `Error::InvalidCardUid` if the string is not valid hex.
    pub fn from_wire(s: &str) -> Result<Self> {
        let raw =
            u64::from_str_radix(s, 16).map_err(|_| Error::InvalidCardUid(s.to_string()))?;
        Ok(CardUid(raw))
    }
}

impl fmt::Display for CardUid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_wire())
    }
}

/// Privilege level of a badge holder, ordered from least to most trusted.
///
/// Maintenance registration requires at least [`UserLevel::Staff`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[repr(u8)]
pub enum UserLevel {
    #[default]
    Unknown = 0,
    User = 1,
    Staff = 2,
    Admin = 3,
}

impl UserLevel {
    /// Decode the numeric `level` field of a backend user response.
    ///
    /// # Errors
    /// Returns `Error::InvalidUserLevel` for codes above 3.
    pub fn from_u8(code: u8) -> Result<Self> {
        match code {
            0 => Ok(UserLevel::Unknown),
            1 => Ok(UserLevel::User),
            2 => Ok(UserLevel::Staff),
            3 => Ok(UserLevel::Admin),
            _ => Err(Error::InvalidUserLevel { code }),
        }
    }

    #[inline]
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Staff and admins may register maintenance and bypass the
    /// maintenance block.
    #[inline]
    #[must_use]
    pub fn can_maintain(self) -> bool {
        self >= UserLevel::Staff
    }
}

impl fmt::Display for UserLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            UserLevel::Unknown => "Unknown",
            UserLevel::User => "User",
            UserLevel::Staff => "Staff",
            UserLevel::Admin => "Admin",
        };
        write!(f, "{s}")
    }
}

/// A badge holder, created transiently on each authorization attempt.
///
/// Equality is defined by card UID only; two `FabUser` values with the same
/// UID compare equal regardless of name or level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FabUser {
    pub card_uid: CardUid,
    pub name: String,
    pub authenticated: bool,
    pub level: UserLevel,
}

impl FabUser {
    #[must_use]
    pub fn new(card_uid: CardUid, name: impl Into<String>, authenticated: bool, level: UserLevel) -> Self {
        Self {
            card_uid,
            name: name.into(),
            authenticated,
            level,
        }
    }
}

impl PartialEq for FabUser {
    fn eq(&self, other: &Self) -> bool {
        self.card_uid == other.card_uid
    }
}

impl Eq for FabUser {}

impl fmt::Display for FabUser {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "User(auth:{}, uid:{}, name:{}, level:{})",
            self.authenticated, self.card_uid, self.name, self.level
        )
    }
}

/// Identifier of the machine controlled by this board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineId(pub u16);

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of machine behind the relay, as configured on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum MachineType {
    #[default]
    Invalid = 0,
    Printer3D = 1,
    Laser = 2,
    Cnc = 3,
    Unknown = 4,
}

impl MachineType {
    /// Decode the numeric `type` field of a backend machine response.
    /// Unrecognized codes map to [`MachineType::Unknown`] rather than
    /// failing; machine type only affects display.
    #[must_use]
    pub fn from_u8(code: u8) -> Self {
        match code {
            0 => MachineType::Invalid,
            1 => MachineType::Printer3D,
            2 => MachineType::Laser,
            3 => MachineType::Cnc,
            _ => MachineType::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case([0xD1, 0xCC, 0xBB, 0xAA], 0xAABBCCD1)]
    #[case([0x01, 0x00, 0x00, 0x00], 0x1)]
    #[case([0x00, 0x00, 0x00, 0x00], 0x0)]
    fn test_uid_from_bytes(#[case] bytes: [u8; 4], #[case] expected: u64) {
        assert_eq!(CardUid::from_bytes(bytes).as_u64(), expected);
    }

    #[test]
    fn test_uid_byte_roundtrip() {
        let uid = CardUid::new(0xAABBCCD1);
        assert_eq!(CardUid::from_bytes(uid.to_bytes()), uid);
    }

    #[test]
    fn test_uid_wire_format() {
        let uid = CardUid::new(0xAABBCCD1);
        assert_eq!(uid.to_wire(), "AABBCCD1");
        assert_eq!(CardUid::from_wire("AABBCCD1").unwrap(), uid);
    }

    #[test]
    fn test_uid_wire_reject_garbage() {
        assert!(CardUid::from_wire("not-hex").is_err());
    }

    #[test]
    fn test_invalid_uid_sentinel() {
        assert!(CardUid::INVALID.is_invalid());
        assert!(!CardUid::new(1).is_invalid());
        assert_eq!(CardUid::default(), CardUid::INVALID);
        assert_eq!(FabUser::default().card_uid, CardUid::INVALID);
    }

    #[test]
    fn test_user_level_ordering() {
        assert!(UserLevel::Unknown < UserLevel::User);
        assert!(UserLevel::User < UserLevel::Staff);
        assert!(UserLevel::Staff < UserLevel::Admin);
    }

    #[rstest]
    #[case(UserLevel::Unknown, false)]
    #[case(UserLevel::User, false)]
    #[case(UserLevel::Staff, true)]
    #[case(UserLevel::Admin, true)]
    fn test_can_maintain(#[case] level: UserLevel, #[case] expected: bool) {
        assert_eq!(level.can_maintain(), expected);
    }

    #[test]
    fn test_user_level_decode() {
        assert_eq!(UserLevel::from_u8(2).unwrap(), UserLevel::Staff);
        assert!(UserLevel::from_u8(17).is_err());
    }

    #[test]
    fn test_user_equality_is_uid_only() {
        let a = FabUser::new(CardUid::new(42), "Alice", true, UserLevel::Admin);
        let b = FabUser::new(CardUid::new(42), "Bob", false, UserLevel::User);
        let c = FabUser::new(CardUid::new(43), "Alice", true, UserLevel::Admin);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_machine_type_unknown_fallback() {
        assert_eq!(MachineType::from_u8(2), MachineType::Laser);
        assert_eq!(MachineType::from_u8(200), MachineType::Unknown);
    }
}
