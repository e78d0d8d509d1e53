//! Shared peripheral value types.

/// Color shown on the status LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedColor {
    #[default]
    Off,
    /// Idle, ready for a card.
    Blue,
    /// Session in progress.
    Green,
    /// Grace period or attention needed.
    Orange,
    /// Denied or error.
    Red,
}

/// Status glyphs shown alongside the text rows.
///
/// Compared against the previous frame so the display is only redrawn when
/// something actually changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoardInfo {
    /// Backend reachable over the network.
    pub backend_online: bool,
    /// Machine relay currently energized.
    pub powered: bool,
    /// Power-off warning in effect (grace period running).
    pub power_warning: bool,
}
