//! State machine for the one controlled machine.
//!
//! Owns the power state, the active session and its timing. Two-phase
//! lifecycle: constructed inert, then [`Machine::configure`] binds the
//! per-boot configuration; every stateful operation fails clearly before
//! that. The backend client is passed into the operations that may publish
//! (message-based power switch) rather than stored, so one client serves
//! the whole board.

use std::time::Duration;

use fabomatic_backend::{BackendClient, PubSubTransport};
use fabomatic_core::constants::{
    BEEP_REMAINING_PERIOD, DEFAULT_AUTOLOGOFF_DELAY, DEFAULT_GRACE_PERIOD,
};
use fabomatic_core::{Error, FabUser, MachineId, MachineType, Result};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Attempts for the message-based power switch before giving up.
const POWER_RETRIES: u32 = 3;
const POWER_RETRY_DELAY: Duration = Duration::from_millis(500);

/// How the machine's power is switched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerControl {
    /// No physical control, state is tracked only.
    None,
    /// GPIO relay.
    Relay { pin: u8, active_low: bool },
    /// Publish/subscribe switch (smart plug).
    MqttSwitch {
        topic: String,
        on_payload: String,
        off_payload: String,
    },
}

/// Per-boot machine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineConfig {
    pub machine_id: MachineId,
    pub machine_type: MachineType,
    pub name: String,
    pub power_control: PowerControl,
    /// Session length after which the user is logged off automatically.
    /// Zero disables the check.
    pub autologoff: Duration,
    /// Delay between logout and physical power-off. Zero powers off
    /// immediately.
    pub grace_period: Duration,
}

impl MachineConfig {
    pub fn new(machine_id: MachineId, machine_type: MachineType, name: impl Into<String>) -> Self {
        Self {
            machine_id,
            machine_type,
            name: name.into(),
            power_control: PowerControl::None,
            autologoff: DEFAULT_AUTOLOGOFF_DELAY,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    #[must_use]
    pub fn with_power_control(mut self, power_control: PowerControl) -> Self {
        self.power_control = power_control;
        self
    }

    #[must_use]
    pub fn with_autologoff(mut self, autologoff: Duration) -> Self {
        self.autologoff = autologoff;
        self
    }

    #[must_use]
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }
}

/// Power state of the controlled machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerState {
    #[default]
    Unknown,
    PoweredOn,
    /// Logged out, grace period running before physical power-off.
    WaitingForPowerOff,
    PoweredOff,
}

/// The controlled machine.
///
/// Invariants: `active` holds exactly when a usage start timestamp exists;
/// `WaitingForPowerOff` holds exactly when a logoff timestamp exists and no
/// session is active.
#[derive(Debug, Default)]
pub struct Machine {
    config: Option<MachineConfig>,
    maintenance_needed: bool,
    allowed: bool,
    active: bool,
    current_user: Option<FabUser>,
    usage_start: Option<Instant>,
    logoff_at: Option<Instant>,
    power_state: PowerState,
}

impl Machine {
    pub fn new() -> Self {
        Self {
            allowed: true,
            ..Self::default()
        }
    }

    /// Bind or replace the configuration. Calling this again fully replaces
    /// the previous configuration; session state is untouched.
    pub fn configure(&mut self, config: MachineConfig) {
        info!(machine = %config.name, id = config.machine_id.0, "machine configured");
        self.config = Some(config);
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    fn config(&self) -> Result<&MachineConfig> {
        self.config.as_ref().ok_or(Error::NotConfigured("machine"))
    }

    /// Whether no session is in progress.
    #[must_use]
    pub fn is_free(&self) -> bool {
        !self.active
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn active_user(&self) -> Option<&FabUser> {
        self.current_user.as_ref()
    }

    #[must_use]
    pub fn power_state(&self) -> PowerState {
        self.power_state
    }

    #[must_use]
    pub fn is_powered(&self) -> bool {
        matches!(
            self.power_state,
            PowerState::PoweredOn | PowerState::WaitingForPowerOff
        )
    }

    #[must_use]
    pub fn maintenance_needed(&self) -> bool {
        self.maintenance_needed
    }

    pub fn set_maintenance_needed(&mut self, needed: bool) {
        self.maintenance_needed = needed;
    }

    #[must_use]
    pub fn allowed(&self) -> bool {
        self.allowed
    }

    pub fn set_allowed(&mut self, allowed: bool) {
        self.allowed = allowed;
    }

    pub fn set_autologoff(&mut self, autologoff: Duration) {
        if let Some(config) = self.config.as_mut() {
            config.autologoff = autologoff;
        }
    }

    pub fn set_grace_period(&mut self, grace_period: Duration) {
        if let Some(config) = self.config.as_mut() {
            config.grace_period = grace_period;
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        if let Some(config) = self.config.as_mut() {
            config.name = name.into();
        }
    }

    pub fn set_machine_type(&mut self, machine_type: MachineType) {
        if let Some(config) = self.config.as_mut() {
            config.machine_type = machine_type;
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.config.as_ref().map_or("", |c| c.name.as_str())
    }

    /// Start a session for `user`.
    ///
    /// Succeeds only when the machine is free and not globally blocked; a
    /// refused login leaves all state untouched. On success the machine is
    /// powered on.
    ///
    /// # Errors
    /// Returns an error when called before [`configure`](Self::configure).
    pub async fn login<T: PubSubTransport>(
        &mut self,
        user: FabUser,
        backend: &mut BackendClient<T>,
    ) -> Result<bool> {
        self.config()?;
        if !self.is_free() || !self.allowed {
            debug!(free = self.is_free(), allowed = self.allowed, "login refused");
            return Ok(false);
        }
        info!(user = %user, machine = %self.name(), "session started");
        self.active = true;
        self.current_user = Some(user);
        self.usage_start = Some(Instant::now());
        self.power(true, backend).await?;
        Ok(true)
    }

    /// End the active session, if any. Idempotent.
    ///
    /// With a non-zero grace period the machine enters
    /// [`PowerState::WaitingForPowerOff`]; with a zero grace period it is
    /// powered off immediately.
    ///
    /// # Errors
    /// Returns an error when called before [`configure`](Self::configure).
    pub async fn logout<T: PubSubTransport>(
        &mut self,
        backend: &mut BackendClient<T>,
    ) -> Result<()> {
        let grace = self.config()?.grace_period;
        if !self.active {
            return Ok(());
        }
        info!(machine = %self.name(), "session ended");
        self.active = false;
        self.current_user = None;
        self.usage_start = None;
        if grace.is_zero() {
            self.power(false, backend).await?;
        } else {
            self.logoff_at = Some(Instant::now());
            self.power_state = PowerState::WaitingForPowerOff;
        }
        Ok(())
    }

    /// Whether the grace period elapsed and the machine may be cut off.
    #[must_use]
    pub fn can_power_off(&self) -> bool {
        match (self.power_state, self.logoff_at, &self.config) {
            (PowerState::WaitingForPowerOff, Some(logoff_at), Some(config)) => {
                logoff_at.elapsed() > config.grace_period
            }
            _ => false,
        }
    }

    /// Whether the grace period is in its final stretch, driving the
    /// audible pre-shutdown warning.
    #[must_use]
    pub fn is_shutdown_imminent(&self) -> bool {
        match (self.power_state, self.logoff_at, &self.config) {
            (PowerState::WaitingForPowerOff, Some(logoff_at), Some(config)) => {
                logoff_at.elapsed() + BEEP_REMAINING_PERIOD >= config.grace_period
            }
            _ => false,
        }
    }

    /// Switch the machine's power through the configured control method.
    ///
    /// # Errors
    /// Returns an error when called before [`configure`](Self::configure).
    /// Delivery failures of the message-based switch are retried a bounded
    /// number of times, then logged and accepted; the tracked power state
    /// may then be stale.
    pub async fn power<T: PubSubTransport>(
        &mut self,
        on: bool,
        backend: &mut BackendClient<T>,
    ) -> Result<()> {
        match self.config()?.power_control.clone() {
            PowerControl::None => {
                debug!(on, "power state tracked only");
            }
            PowerControl::Relay { pin, active_low } => {
                debug!(pin, level = on != active_low, "relay switched");
            }
            PowerControl::MqttSwitch {
                topic,
                on_payload,
                off_payload,
            } => {
                let payload = if on { &on_payload } else { &off_payload };
                self.publish_power(backend, &topic, payload).await;
            }
        }
        if on {
            self.power_state = PowerState::PoweredOn;
            self.logoff_at = None;
        } else {
            self.power_state = PowerState::PoweredOff;
            self.logoff_at = None;
        }
        Ok(())
    }

    async fn publish_power<T: PubSubTransport>(
        &self,
        backend: &mut BackendClient<T>,
        topic: &str,
        payload: &str,
    ) {
        for attempt in 1..=POWER_RETRIES {
            match backend.publish_raw(topic, payload).await {
                Ok(()) => return,
                Err(err) => {
                    warn!(%err, attempt, max = POWER_RETRIES, "power switch publish failed");
                }
            }
            if attempt < POWER_RETRIES {
                tokio::time::sleep(POWER_RETRY_DELAY).await;
            }
        }
        warn!(topic, "power switch unreachable, tracked state may be stale");
    }

    /// Whether the active session outlived the auto-logoff delay.
    #[must_use]
    pub fn is_autologoff_expired(&self) -> bool {
        let Some(config) = self.config.as_ref() else {
            return false;
        };
        if config.autologoff.is_zero() {
            return false;
        }
        self.usage_start
            .is_some_and(|start| start.elapsed() > config.autologoff)
    }

    /// Elapsed session time, zero when no session is active.
    #[must_use]
    pub fn usage_duration(&self) -> Duration {
        self.usage_start.map_or(Duration::ZERO, |s| s.elapsed())
    }
}
