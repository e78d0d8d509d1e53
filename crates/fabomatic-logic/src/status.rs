//! Externally observable board states.

use fabomatic_hardware::LedColor;

/// Every UI state the board can show. Owned by the board logic and mutated
/// only through its `change_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    /// Blank screen, nothing to show yet.
    #[default]
    Clear,
    /// Machine free, waiting for a badge.
    MachineFree,
    /// Session started for the badge holder.
    LoggedIn,
    /// Badge refused.
    LoginDenied,
    /// Machine busy (generic).
    Busy,
    /// Session ended.
    LoggedOut,
    /// Connecting to the backend.
    Connecting,
    /// Connected to the backend.
    Connected,
    /// A different badge was tapped during someone else's session.
    AlreadyInUse,
    /// Session in progress, shown during ticks.
    MachineInUse,
    /// Backend unreachable, offline rules apply.
    Offline,
    /// Machine globally blocked by the backend.
    NotAllowed,
    /// Badge seen, authorization in progress.
    Verifying,
    /// Machine flagged for maintenance, normal users blocked.
    MaintenanceNeeded,
    /// Asking a qualified user to confirm the maintenance intervention.
    MaintenanceQuery,
    /// Maintenance registered with the backend.
    MaintenanceDone,
    /// Unrecoverable logic error, reset required.
    Error,
    /// Peripheral failed to initialize, reset required.
    ErrorHardware,
    /// Configuration portal lifecycle, driven externally.
    PortalStarting,
    PortalSuccess,
    PortalFailed,
    /// Boot banner.
    Booting,
    ShuttingDown,
    /// Firmware update lifecycle, driven externally.
    OtaStarting,
    OtaError,
    FactoryDefaults,
}

impl Status {
    /// Whether this state should only replace the display after the
    /// minimum visible dwell.
    #[must_use]
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Status::LoginDenied
                | Status::LoggedOut
                | Status::AlreadyInUse
                | Status::NotAllowed
                | Status::MaintenanceDone
        )
    }

    /// LED color shown for this state.
    #[must_use]
    pub fn led_color(self) -> LedColor {
        match self {
            Status::LoggedIn | Status::MachineInUse | Status::Busy => LedColor::Green,
            Status::LoginDenied
            | Status::NotAllowed
            | Status::AlreadyInUse
            | Status::Error
            | Status::ErrorHardware
            | Status::OtaError
            | Status::PortalFailed => LedColor::Red,
            Status::MaintenanceNeeded | Status::MaintenanceQuery | Status::Offline => {
                LedColor::Orange
            }
            Status::MachineFree | Status::Connected | Status::LoggedOut | Status::MaintenanceDone => {
                LedColor::Blue
            }
            _ => LedColor::Off,
        }
    }
}
