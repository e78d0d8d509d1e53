//! Board orchestration: the top-level state machine.
//!
//! Reacts to badge taps and periodic ticks, drives the machine and the
//! backend client in lock-step, and renders every externally observable
//! state change to the LCD, LED and buzzer. Communication failures are
//! never fatal here: they surface as offline behavior and stale policy.
//! Only peripheral initialization may abort the boot.

use std::time::Duration;

use fabomatic_backend::{BackendClient, BackendConfig, PubSubTransport};
use fabomatic_core::constants::{
    LONG_TAP_DURATION, LONG_TAP_STEPS, MAINTENANCE_BLOCK, MIN_DISPLAY_DWELL,
};
use fabomatic_core::{CardUid, Error, MachineType, Result, VERSION};
use fabomatic_hardware::{BoardInfo, Buzzer, Display, RfidReader, StatusLed};
use fabomatic_storage::SavedSettings;
use tracing::{debug, info, warn};

use crate::auth::{AuthProvider, WhiteListEntry};
use crate::machine::{Machine, MachineConfig};
use crate::messages;
use crate::status::Status;

/// Identity reported in the presence announcement.
#[derive(Debug, Clone, Default)]
pub struct BoardIdentity {
    pub ip: String,
    pub serial: String,
    pub heap_free: u64,
}

/// The board state machine, generic over its peripherals and transport.
pub struct BoardLogic<R, D, B, L, T>
where
    R: RfidReader,
    D: Display,
    B: Buzzer,
    L: StatusLed,
    T: PubSubTransport,
{
    rfid: R,
    display: D,
    buzzer: B,
    led: L,
    backend: BackendClient<T>,
    machine: Machine,
    auth: AuthProvider,
    identity: BoardIdentity,
    status: Status,
}

impl<R, D, B, L, T> BoardLogic<R, D, B, L, T>
where
    R: RfidReader,
    D: Display,
    B: Buzzer,
    L: StatusLed,
    T: PubSubTransport,
{
    pub fn new(
        rfid: R,
        display: D,
        buzzer: B,
        led: L,
        backend: BackendClient<T>,
        whitelist: &'static [WhiteListEntry],
        identity: BoardIdentity,
    ) -> Self {
        Self {
            rfid,
            display,
            buzzer,
            led,
            backend,
            machine: Machine::new(),
            auth: AuthProvider::new(whitelist),
            identity,
            status: Status::Clear,
        }
    }

    /// Bind the per-boot configuration for the machine and the backend.
    pub fn configure(&mut self, machine: MachineConfig, backend: BackendConfig) {
        self.machine.configure(machine);
        self.backend.configure(backend);
    }

    /// Initialize the peripherals. A failure here is boot-blocking.
    ///
    /// # Errors
    /// Returns an error and shows [`Status::ErrorHardware`] when the RFID
    /// reader or the display cannot be brought up.
    pub async fn init_hardware(&mut self) -> Result<()> {
        if let Err(err) = self.rfid.init().await {
            self.change_status(Status::ErrorHardware).await;
            return Err(Error::HardwareInit(format!("RFID reader: {err}")));
        }
        if let Err(err) = self.display.begin().await {
            self.change_status(Status::ErrorHardware).await;
            return Err(Error::HardwareInit(format!("display: {err}")));
        }
        Ok(())
    }

    /// Boot sequence: banner, backend connect, initial policy fetch,
    /// presence announcement, idle screen.
    pub async fn boot(&mut self) {
        self.change_status(Status::Booting).await;
        self.connect_backend().await;
        self.refresh_from_server().await;
        self.announce().await;
        let idle = self.idle_status();
        self.change_status(idle).await;
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    #[must_use]
    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    pub fn backend_mut(&mut self) -> &mut BackendClient<T> {
        &mut self.backend
    }

    pub fn auth_mut(&mut self) -> &mut AuthProvider {
        &mut self.auth
    }

    /// Poll the reader and react to a badge tap. One tick of the main
    /// loop, scheduled every
    /// [`RFID_CHECK_PERIOD`](fabomatic_core::constants::RFID_CHECK_PERIOD).
    pub async fn check_rfid(&mut self) {
        let new_card = match self.rfid.is_new_card_present().await {
            Ok(new_card) => new_card,
            Err(err) => {
                warn!(%err, "RFID poll failed");
                return;
            }
        };
        if !new_card {
            return;
        }
        let uid = match self.rfid.read_card_serial().await {
            Ok(uid) => uid,
            Err(err) => {
                warn!(%err, "card read failed");
                return;
            }
        };
        debug!(%uid, "badge tapped");

        if self.machine.is_free() {
            self.authorize(uid).await;
            // Always refetch the policy on a tap so the next decision uses
            // the freshest maintenance/allowed flags.
            self.refresh_from_server().await;
        } else if self.machine.active_user().map(|u| u.card_uid) == Some(uid) {
            self.logout_user().await;
        } else {
            let holder = self
                .machine
                .active_user()
                .map_or_else(String::new, |u| u.name.clone());
            info!(%uid, %holder, "machine already in use");
            self.change_status(Status::AlreadyInUse).await;
            self.beep_fail().await;
            self.settle().await;
            self.change_status(Status::MachineInUse).await;
        }
    }

    /// Authorize a badge and start a session. Returns whether a session
    /// started.
    pub async fn authorize(&mut self, uid: CardUid) -> bool {
        self.change_status(Status::Verifying).await;

        let Some(user) = self.auth.try_login(uid, &mut self.backend).await else {
            self.change_status(Status::LoginDenied).await;
            self.beep_fail().await;
            self.settle_to_idle().await;
            return false;
        };

        if !self.machine.allowed() {
            info!(%uid, "machine blocked by backend policy");
            self.change_status(Status::NotAllowed).await;
            self.beep_fail().await;
            self.settle_to_idle().await;
            return false;
        }

        if self.machine.maintenance_needed() && MAINTENANCE_BLOCK {
            if !user.level.can_maintain() {
                info!(%uid, "maintenance pending, normal user blocked");
                self.change_status(Status::MaintenanceNeeded).await;
                self.beep_fail().await;
                self.settle_to_idle().await;
                return false;
            }
            // Qualified user: offer to register the intervention. Login
            // proceeds whether or not they confirm.
            self.change_status(Status::MaintenanceQuery).await;
            if self.long_tap(uid, "Maintenance?").await {
                self.register_maintenance(uid).await;
            }
        }

        match self.machine.login(user, &mut self.backend).await {
            Ok(true) => {
                // Record-carrying: buffered if the backend is unreachable.
                if let Err(err) = self.backend.start_use(uid).await {
                    warn!(%err, "start_use not recorded");
                }
                self.change_status(Status::LoggedIn).await;
                self.beep_ok().await;
                true
            }
            Ok(false) => {
                self.change_status(Status::NotAllowed).await;
                self.beep_fail().await;
                self.settle_to_idle().await;
                false
            }
            Err(err) => {
                warn!(%err, "login failed");
                self.change_status(Status::Error).await;
                false
            }
        }
    }

    /// End the active session: record usage, power down per grace policy.
    pub async fn logout_user(&mut self) {
        let Some(user) = self.machine.active_user() else {
            return;
        };
        let uid = user.card_uid;
        let duration = self.machine.usage_duration();
        if let Err(err) = self.backend.finish_use(uid, duration).await {
            warn!(%err, "finish_use not recorded");
        }
        if let Err(err) = self.machine.logout(&mut self.backend).await {
            warn!(%err, "logout failed");
            return;
        }
        self.change_status(Status::LoggedOut).await;
        self.beep_ok().await;
        self.settle_to_idle().await;
    }

    /// Periodic: cut power once the grace period has fully elapsed.
    pub async fn check_power_off(&mut self) {
        if self.machine.can_power_off() {
            info!("grace period over, powering off");
            if let Err(err) = self.machine.power(false, &mut self.backend).await {
                warn!(%err, "power-off failed");
            }
            self.update_lcd(true).await;
        }
    }

    /// Periodic: log the user off once the session outlives the
    /// auto-logoff delay.
    pub async fn check_autologoff(&mut self) {
        if self.machine.is_autologoff_expired() {
            info!("session expired, automatic logoff");
            self.logout_user().await;
        }
    }

    /// Periodic: audible warning during the final stretch of the grace
    /// period.
    pub async fn check_shutdown_warning(&mut self) {
        if self.machine.is_shutdown_imminent() {
            self.beep_fail().await;
            self.update_lcd(true).await;
        }
    }

    /// Periodic: tell the backend the session is still running, so usage
    /// data survives a mid-session reboot.
    pub async fn notify_in_use(&mut self) {
        if let Some(user) = self.machine.active_user() {
            let uid = user.card_uid;
            let duration = self.machine.usage_duration();
            if let Err(err) = self.backend.in_use(uid, duration).await {
                warn!(%err, "in_use notification failed");
            }
        }
    }

    /// Periodic: verify the reader still answers, resetting it once on
    /// failure. Scheduled every
    /// [`RFID_SELFTEST_PERIOD`](fabomatic_core::constants::RFID_SELFTEST_PERIOD).
    pub async fn check_rfid_health(&mut self) {
        if let Err(err) = self.rfid.self_test().await {
            warn!(%err, "RFID self-test failed, resetting reader");
            if let Err(err) = self.rfid.reset().await {
                warn!(%err, "RFID reset failed");
                self.change_status(Status::ErrorHardware).await;
            }
        }
    }

    /// Restore runtime state from the persisted settings blob: the
    /// undelivered-message snapshot and the offline card cache.
    pub fn restore_state(&mut self, settings: &SavedSettings) {
        if let Some(snapshot) = &settings.message_buffer {
            self.backend.restore_buffer(snapshot);
        }
        self.auth.load_cache(settings.card_cache.clone());
    }

    /// Checkpoint runtime state into the settings blob. Only dirty parts
    /// are rewritten; the caller decides when to persist, bounding write
    /// wear.
    pub fn checkpoint_state(&mut self, settings: &mut SavedSettings) {
        if self.backend.buffer_dirty() {
            match self.backend.buffer_snapshot() {
                Ok(snapshot) => settings.message_buffer = Some(snapshot),
                Err(err) => warn!(%err, "buffer snapshot failed"),
            }
        }
        if self.auth.cache_dirty() {
            settings.card_cache = self.auth.cache_snapshot();
        }
        settings.touch();
    }

    /// Fetch the machine policy and apply it. On failure the last known
    /// policy is kept; stale values are an accepted risk. Scheduled every
    /// [`BACKEND_REFRESH_PERIOD`](fabomatic_core::constants::BACKEND_REFRESH_PERIOD).
    pub async fn refresh_from_server(&mut self) {
        match self.backend.check_machine().await {
            Ok(resp) if resp.request_ok && resp.is_valid => {
                debug!(
                    maintenance = resp.maintenance,
                    allowed = resp.allowed,
                    "policy refreshed"
                );
                self.machine.set_maintenance_needed(resp.maintenance);
                self.machine.set_allowed(resp.allowed);
                if resp.logoff > 0 {
                    self.machine
                        .set_autologoff(Duration::from_secs(resp.logoff * 60));
                }
                if let Some(grace) = resp.grace {
                    self.machine.set_grace_period(Duration::from_secs(grace * 60));
                }
                if !matches!(resp.machine_type(), MachineType::Invalid | MachineType::Unknown) {
                    self.machine.set_machine_type(resp.machine_type());
                }
                if let Some(description) = resp.description {
                    self.machine.set_name(description);
                }
            }
            Ok(_) => {
                debug!("policy fetch unanswered, keeping last known policy");
            }
            Err(err) => {
                warn!(%err, "policy fetch failed, keeping last known policy");
            }
        }
    }

    /// Long-tap confirmation: the badge must stay on the reader through a
    /// step-by-step countdown. Returns `false` the moment it is lifted.
    pub async fn long_tap(&mut self, uid: CardUid, prompt: &str) -> bool {
        let step = LONG_TAP_DURATION / LONG_TAP_STEPS;
        for steps_left in (1..=LONG_TAP_STEPS).rev() {
            match self.rfid.card_still_there(uid).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(steps_left, "long tap cancelled, badge lifted");
                    return false;
                }
                Err(err) => {
                    warn!(%err, "long tap aborted, reader error");
                    return false;
                }
            }
            let rows = messages::countdown_rows(prompt, steps_left);
            fabomatic_hardware::traits::set_rows(&mut self.display, &rows);
            self.push_display(true).await;
            tokio::time::sleep(step).await;
        }
        self.rfid.card_still_there(uid).await.unwrap_or(false)
    }

    /// Switch the observable state, logging the transition and rendering
    /// the display, LED and connection glyphs.
    pub async fn change_status(&mut self, status: Status) {
        if self.status != status {
            info!(from = ?self.status, to = ?status, "status change");
        }
        self.status = status;
        self.update_lcd(false).await;
        if let Err(err) = self.led.set_color(status.led_color()).await {
            warn!(%err, "LED update failed");
        }
    }

    /// Render the current state. Pure projection, no machine mutation.
    pub async fn update_lcd(&mut self, forced: bool) {
        let rows = messages::rows(self.status, &self.machine);
        fabomatic_hardware::traits::set_rows(&mut self.display, &rows);
        self.push_display(forced).await;
    }

    async fn push_display(&mut self, forced: bool) {
        let info = BoardInfo {
            backend_online: self.backend.is_online(),
            powered: self.machine.is_powered(),
            power_warning: self.machine.is_shutdown_imminent(),
        };
        if let Err(err) = self.display.update(info, forced).await {
            warn!(%err, "display update failed");
        }
    }

    async fn connect_backend(&mut self) {
        self.change_status(Status::Connecting).await;
        match self.backend.connect().await {
            Ok(()) => self.change_status(Status::Connected).await,
            Err(err) => {
                warn!(%err, "backend unreachable, offline rules apply");
                self.change_status(Status::Offline).await;
            }
        }
    }

    async fn announce(&mut self) {
        if let Err(err) = self
            .backend
            .alive(
                VERSION,
                &self.identity.ip,
                &self.identity.serial,
                self.identity.heap_free,
            )
            .await
        {
            debug!(%err, "presence announcement not delivered");
        }
    }

    async fn register_maintenance(&mut self, uid: CardUid) {
        match self.backend.register_maintenance(uid).await {
            Ok(resp) if resp.request_ok => {
                info!(%uid, "maintenance registered");
                self.machine.set_maintenance_needed(false);
                self.change_status(Status::MaintenanceDone).await;
                self.beep_ok().await;
                self.settle().await;
            }
            _ => {
                warn!(%uid, "maintenance registration not acknowledged");
                self.beep_fail().await;
            }
        }
    }

    /// The resting state for the current machine state.
    fn idle_status(&self) -> Status {
        if self.machine.is_active() {
            Status::MachineInUse
        } else if self.backend.is_online() {
            Status::MachineFree
        } else {
            Status::Offline
        }
    }

    /// Hold a transient state on screen for the minimum visible duration,
    /// then fall back to the resting state.
    async fn settle_to_idle(&mut self) {
        self.settle().await;
        let idle = self.idle_status();
        self.change_status(idle).await;
    }

    async fn settle(&mut self) {
        if self.status.is_transient() {
            tokio::time::sleep(MIN_DISPLAY_DWELL).await;
        }
    }

    async fn beep_ok(&mut self) {
        if let Err(err) = self.buzzer.beep_ok().await {
            warn!(%err, "buzzer failed");
        }
    }

    async fn beep_fail(&mut self) {
        if let Err(err) = self.buzzer.beep_fail().await {
            warn!(%err, "buzzer failed");
        }
    }
}
