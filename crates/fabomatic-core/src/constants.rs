//! Board-wide configuration constants.
//!
//! These mirror the per-board compile-time configuration of the terminal:
//! protocol topics, retry budgets, session timing defaults, and the bounded
//! capacities that give the firmware its fixed memory footprint. Changing the
//! capacities changes the persistence format only insofar as more or fewer
//! entries survive a reboot; the snapshot layout itself is versioned by a
//! magic number (see `fabomatic-protocol` and `fabomatic-storage`).

use std::time::Duration;

// ============================================================================
// RFID tags
// ============================================================================

/// Number of bytes in the card UID as read from the reader.
pub const UID_BYTE_LEN: usize = 4;

/// Number of cached authorization results kept for offline fallback.
pub const CACHE_LEN: usize = 10;

/// Number of compile-time whitelisted cards.
pub const WHITELIST_LEN: usize = 10;

// ============================================================================
// LCD
// ============================================================================

/// Number of rows on the character LCD.
pub const LCD_ROWS: usize = 2;

/// Number of columns on the character LCD.
pub const LCD_COLS: usize = 16;

/// Minimum time a transient status stays visible before the next render
/// replaces it. Preserves user perception of short-lived states
/// (LoggedOut, AlreadyInUse, MaintenanceDone, ...).
pub const MIN_DISPLAY_DWELL: Duration = Duration::from_secs(1);

// ============================================================================
// Machine policy defaults
// ============================================================================

/// User is logged out after this delay of continuous usage.
/// Zero disables auto-logoff. May be overridden by backend policy.
pub const DEFAULT_AUTOLOGOFF_DELAY: Duration = Duration::from_secs(8 * 60 * 60);

/// Idle time between logout and physical power-off. Zero powers off
/// immediately at logout.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2 * 60);

/// The board starts beeping this long before the grace period's physical
/// cutoff. Must not exceed [`DEFAULT_GRACE_PERIOD`].
pub const BEEP_REMAINING_PERIOD: Duration = Duration::from_secs(60);

/// If true, a machine flagged for maintenance is blocked for normal users.
pub const MAINTENANCE_BLOCK: bool = true;

/// Total duration the badge must be held to confirm a maintenance
/// registration.
pub const LONG_TAP_DURATION: Duration = Duration::from_secs(3);

/// Number of countdown steps shown during the long-tap confirmation.
pub const LONG_TAP_STEPS: u32 = 6;

// ============================================================================
// Backend protocol
// ============================================================================

/// Initial part of the request topic; the machine ID is appended.
pub const TOPIC_PREFIX: &str = "/machine";

/// Server reply sub-topic, appended to the full machine topic.
pub const RESPONSE_TOPIC: &str = "/reply";

/// Maximum attempts when publishing a request that expects a reply.
pub const MAX_TRIES: u32 = 3;

/// How long to wait for a server reply on each attempt.
pub const TIMEOUT_REPLY: Duration = Duration::from_millis(2000);

/// Maximum encoded size of topic + payload for one message.
pub const MAX_MSG_SIZE: usize = 255;

/// Capacity of the undelivered-message buffer. Past this bound the oldest
/// (back-push) or newest (front-push) entry is evicted.
pub const MAX_BUFFERED_MESSAGES: usize = 40;

// ============================================================================
// Periodic tasks
// ============================================================================

/// Period between RFID polls. Should stay fast for snappy badge detection.
pub const RFID_CHECK_PERIOD: Duration = Duration::from_millis(150);

/// Period between RFID chip self-tests.
pub const RFID_SELFTEST_PERIOD: Duration = Duration::from_secs(60);

/// Period between backend policy refreshes / alive announcements.
pub const BACKEND_REFRESH_PERIOD: Duration = Duration::from_secs(30);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beep_period_fits_in_grace_period() {
        assert!(BEEP_REMAINING_PERIOD <= DEFAULT_GRACE_PERIOD);
    }

    #[test]
    fn long_tap_steps_divide_duration() {
        let step = LONG_TAP_DURATION / LONG_TAP_STEPS;
        assert!(step > Duration::ZERO);
    }
}
