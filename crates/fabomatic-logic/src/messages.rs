//! Projection from board state to the two LCD rows.
//!
//! Pure and render-only: for a given status, machine and user the same rows
//! come out, and nothing is mutated.

use std::time::Duration;

use crate::machine::Machine;
use crate::status::Status;
use fabomatic_core::constants::LCD_ROWS;

/// Format a session duration as `H:MM` or `MMmin`.
fn format_duration(duration: Duration) -> String {
    let mins = duration.as_secs() / 60;
    if mins >= 60 {
        format!("{}:{:02}", mins / 60, mins % 60)
    } else {
        format!("{mins}min")
    }
}

/// Compute the two display rows for a status.
#[must_use]
pub fn rows(status: Status, machine: &Machine) -> [String; LCD_ROWS] {
    let user_name = machine.active_user().map_or_else(String::new, |u| u.name.clone());
    match status {
        Status::Clear => [String::new(), String::new()],
        Status::MachineFree => [machine.name().to_string(), "Pass your card".into()],
        Status::LoggedIn => ["Hello,".into(), user_name],
        Status::LoginDenied => ["Card not".into(), "authorized".into()],
        Status::Busy => ["Machine".into(), "in use".into()],
        Status::LoggedOut => ["Goodbye,".into(), "come back soon".into()],
        Status::Connecting => ["Connecting".into(), String::new()],
        Status::Connected => ["Connected".into(), String::new()],
        Status::AlreadyInUse => ["In use by".into(), user_name],
        Status::MachineInUse => [
            format!("In use: {}", format_duration(machine.usage_duration())),
            user_name,
        ],
        Status::Offline => ["Offline mode".into(), "Pass your card".into()],
        Status::NotAllowed => ["Machine".into(), "blocked".into()],
        Status::Verifying => ["Verifying".into(), "card...".into()],
        Status::MaintenanceNeeded => ["Maintenance".into(), "required".into()],
        Status::MaintenanceQuery => ["Maintenance?".into(), "Hold card...".into()],
        Status::MaintenanceDone => ["Maintenance".into(), "registered".into()],
        Status::Error => ["Error".into(), "Reset needed".into()],
        Status::ErrorHardware => ["Hardware error".into(), "Reset needed".into()],
        Status::PortalStarting => ["Config portal".into(), "starting".into()],
        Status::PortalSuccess => ["Config portal".into(), "success".into()],
        Status::PortalFailed => ["Config portal".into(), "error".into()],
        Status::Booting => ["Fab-O-Matic".into(), "booting...".into()],
        Status::ShuttingDown => ["Shutting".into(), "down...".into()],
        Status::OtaStarting => ["Firmware".into(), "update...".into()],
        Status::OtaError => ["Firmware".into(), "update failed".into()],
        Status::FactoryDefaults => ["Factory".into(), "defaults set".into()],
    }
}

/// Rows for one step of the long-tap countdown.
#[must_use]
pub fn countdown_rows(prompt: &str, steps_left: u32) -> [String; LCD_ROWS] {
    [prompt.to_string(), format!("Hold... {steps_left}")]
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabomatic_core::{MachineId, MachineType};
    use crate::machine::MachineConfig;

    #[test]
    fn test_rows_are_stable() {
        let mut machine = Machine::new();
        machine.configure(MachineConfig::new(MachineId(1), MachineType::Laser, "laser1"));
        let first = rows(Status::MachineFree, &machine);
        let second = rows(Status::MachineFree, &machine);
        assert_eq!(first, second);
        assert_eq!(first[0], "laser1");
    }

    #[rstest::rstest]
    #[case(Duration::from_secs(59), "0min")]
    #[case(Duration::from_secs(35 * 60), "35min")]
    #[case(Duration::from_secs(95 * 60), "1:35")]
    #[case(Duration::from_secs(3 * 60 * 60), "3:00")]
    fn test_duration_formats(#[case] duration: Duration, #[case] formatted: &str) {
        assert_eq!(format_duration(duration), formatted);
    }
}
