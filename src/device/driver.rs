//! The storage driver façade - the only component with public operations.

use crate::config::{DriverConfig, PWS_SLOT_COUNT};
use crate::device::credentials::{Credentials, Role};
use crate::device::progress::ProgressTracker;
use crate::device::status::StorageStatus;
use crate::error::{Error, Result};
use crate::pws::{PasswordSafeEntry, SlotStore};
use crate::volume::{DeviceState, HiddenVolumeTable, VolumeRange, VolumeStateMachine};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Everything that survives a power cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    pub(crate) credentials: Credentials,
    pub(crate) hidden_volumes: HiddenVolumeTable,
    pub(crate) password_safe: SlotStore,
    pub(crate) unencrypted_read_only: bool,
    pub(crate) new_sd_card_found: bool,
}

impl PersistedState {
    /// Factory state of a fresh token.
    pub fn factory(config: &DriverConfig) -> Self {
        Self {
            credentials: Credentials::factory(config),
            hidden_volumes: HiddenVolumeTable::new(),
            password_safe: SlotStore::new(),
            unencrypted_read_only: false,
            new_sd_card_found: true,
        }
    }
}

/// Driver for one token.
///
/// Every operation is all-or-nothing: a failed call leaves persisted data and
/// session state as they were. While an SD fill runs, everything except
/// [`lock_device`](Self::lock_device), [`progress_bar_value`](Self::progress_bar_value),
/// [`report_fill_progress`](Self::report_fill_progress) and
/// [`status`](Self::status) fails with [`Error::Busy`].
pub struct StorageDriver {
    config: DriverConfig,
    volumes: VolumeStateMachine,
    password_safe: SlotStore,
    credentials: Credentials,
    unencrypted_read_only: bool,
    new_sd_card_found: bool,
    fill: ProgressTracker,
}

impl StorageDriver {
    /// A token in factory state.
    pub fn new(config: DriverConfig) -> Self {
        let state = PersistedState::factory(&config);
        Self::from_persisted(state, config)
    }

    /// A locked token over previously persisted state.
    pub fn from_persisted(state: PersistedState, config: DriverConfig) -> Self {
        let volumes =
            VolumeStateMachine::new(state.hidden_volumes, config.strict_session_requirement);
        let mut password_safe = state.password_safe;
        password_safe.disable();
        Self {
            config,
            volumes,
            password_safe,
            credentials: state.credentials,
            unencrypted_read_only: state.unencrypted_read_only,
            new_sd_card_found: state.new_sd_card_found,
            fill: ProgressTracker::new(),
        }
    }

    /// Snapshot of the durable state.
    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            credentials: self.credentials.clone(),
            hidden_volumes: self.volumes.hidden_volumes().clone(),
            password_safe: self.password_safe.clone(),
            unencrypted_read_only: self.unencrypted_read_only,
            new_sd_card_found: self.new_sd_card_found,
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn device_state(&self) -> DeviceState {
        self.volumes.state()
    }

    pub fn mounted_hidden_volume(&self) -> Option<usize> {
        self.volumes.mounted_hidden()
    }

    pub fn is_encrypted_volume_unlocked(&self) -> bool {
        self.volumes.is_encrypted_unlocked()
    }

    pub fn is_password_safe_enabled(&self) -> bool {
        self.password_safe.is_enabled()
    }

    pub fn hidden_volumes(&self) -> &HiddenVolumeTable {
        self.volumes.hidden_volumes()
    }

    /// Whether `password` is the current user password. Does not count as an attempt.
    pub fn is_user_password(&self, password: &[u8]) -> bool {
        self.credentials.user().matches(password)
    }

    /// Lock everything. Always succeeds and aborts a running SD fill.
    pub fn lock_device(&mut self) {
        if self.fill.abort() {
            warn!("SD card fill aborted by device lock");
        }
        self.volumes.lock_device();
        self.password_safe.disable();
    }

    /// Unlock the encrypted volume with the user password.
    ///
    /// Also enables the password safe, which shares the credential.
    pub fn unlock_encrypted_volume(&mut self, password: &[u8]) -> Result<()> {
        self.ensure_idle()?;
        let result = self
            .volumes
            .unlock_encrypted(password, self.credentials.user());
        self.credentials
            .record_attempt(Role::User, result.is_ok(), &self.config);
        result?;
        self.password_safe.enable_authenticated();
        Ok(())
    }

    /// Lock the encrypted volume and any hidden volume; the device stays unlocked.
    pub fn lock_encrypted_volume(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.volumes.lock_encrypted_volume();
        Ok(())
    }

    /// Define hidden volume `index` over `[start_percent, end_percent)`.
    pub fn create_hidden_volume(
        &mut self,
        index: usize,
        start_percent: u8,
        end_percent: u8,
        password: &[u8],
    ) -> Result<()> {
        self.ensure_idle()?;
        if !self.volumes.is_encrypted_unlocked() {
            return Err(Error::NotUnlocked);
        }
        let range = VolumeRange::new(start_percent, end_percent)?;
        self.volumes.create_hidden_volume(index, range, password)
    }

    /// Mount the hidden volume unlocked by `password`; returns its slot index.
    pub fn unlock_hidden_volume(&mut self, password: &[u8]) -> Result<usize> {
        self.ensure_idle()?;
        self.volumes.unlock_hidden_volume(password)
    }

    pub fn lock_hidden_volume(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.volumes.lock_hidden_volume()
    }

    /// Enable the password safe with the user password. Legal from a locked device.
    pub fn enable_password_safe(&mut self, password: &[u8]) -> Result<()> {
        self.ensure_idle()?;
        let result = self.password_safe.enable(password, self.credentials.user());
        self.credentials
            .record_attempt(Role::User, result.is_ok(), &self.config);
        result?;
        self.volumes.unlock_device();
        info!("Password safe enabled");
        Ok(())
    }

    pub fn write_password_safe_slot(
        &mut self,
        index: usize,
        name: &[u8],
        login: &[u8],
        password: &[u8],
    ) -> Result<()> {
        self.ensure_idle()?;
        self.password_safe.write(index, name, login, password)
    }

    pub fn password_safe_slot(&self, index: usize) -> Result<PasswordSafeEntry> {
        self.ensure_idle()?;
        self.password_safe.read(index)
    }

    pub fn erase_password_safe_slot(&mut self, index: usize) -> Result<()> {
        self.ensure_idle()?;
        self.password_safe.erase(index)
    }

    pub fn password_safe_slot_status(&self) -> Result<[bool; PWS_SLOT_COUNT]> {
        self.ensure_idle()?;
        self.password_safe.slot_status()
    }

    pub fn set_unencrypted_read_only(&mut self, user_password: &[u8]) -> Result<()> {
        self.set_unencrypted_mode(Role::User, user_password, true)
    }

    pub fn set_unencrypted_read_write(&mut self, user_password: &[u8]) -> Result<()> {
        self.set_unencrypted_mode(Role::User, user_password, false)
    }

    pub fn set_unencrypted_read_only_admin(&mut self, admin_password: &[u8]) -> Result<()> {
        self.set_unencrypted_mode(Role::Admin, admin_password, true)
    }

    pub fn set_unencrypted_read_write_admin(&mut self, admin_password: &[u8]) -> Result<()> {
        self.set_unencrypted_mode(Role::Admin, admin_password, false)
    }

    fn set_unencrypted_mode(&mut self, role: Role, password: &[u8], read_only: bool) -> Result<()> {
        self.ensure_idle()?;
        self.credentials.verify(role, password, &self.config)?;
        self.unencrypted_read_only = read_only;
        info!(read_only, "Unencrypted volume mode changed");
        Ok(())
    }

    pub fn clear_new_sd_card_warning(&mut self, admin_password: &[u8]) -> Result<()> {
        self.ensure_idle()?;
        self.credentials
            .verify(Role::Admin, admin_password, &self.config)?;
        self.new_sd_card_found = false;
        Ok(())
    }

    /// Start overwriting the SD card with random data.
    ///
    /// Completion is driven by [`report_fill_progress`](Self::report_fill_progress).
    pub fn fill_sd_card(&mut self, admin_password: &[u8]) -> Result<()> {
        self.ensure_idle()?;
        self.credentials
            .verify(Role::Admin, admin_password, &self.config)?;
        self.fill.start()?;
        info!("SD card fill started");
        Ok(())
    }

    /// Record fill progress reported by the device.
    pub fn report_fill_progress(&mut self, percent: u8) -> Result<()> {
        if self.fill.report(percent)? {
            info!("SD card fill complete");
        }
        Ok(())
    }

    /// `-1` when idle, otherwise `0..=100`.
    pub fn progress_bar_value(&self) -> i8 {
        self.fill.value()
    }

    pub fn change_user_password(&mut self, old: &[u8], new: &[u8]) -> Result<()> {
        self.ensure_idle()?;
        self.credentials.change(Role::User, old, new, &self.config)?;
        info!("User password changed");
        Ok(())
    }

    pub fn change_admin_password(&mut self, old: &[u8], new: &[u8]) -> Result<()> {
        self.ensure_idle()?;
        self.credentials.change(Role::Admin, old, new, &self.config)?;
        info!("Admin password changed");
        Ok(())
    }

    pub fn status(&self) -> StorageStatus {
        StorageStatus {
            firmware_version: self.config.firmware_version,
            unencrypted_read_only: self.unencrypted_read_only,
            encrypted_volume_active: self.volumes.is_encrypted_unlocked(),
            hidden_volume_active: self.volumes.mounted_hidden().is_some(),
            password_safe_enabled: self.password_safe.is_enabled(),
            new_sd_card_found: self.new_sd_card_found,
            hidden_volumes_defined: self.volumes.hidden_volumes().defined_count(),
            progress: self.fill.value(),
            user_pw_retry_count: self.credentials.retries(Role::User),
            admin_pw_retry_count: self.credentials.retries(Role::Admin),
        }
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.fill.is_busy() {
            Err(Error::Busy)
        } else {
            Ok(())
        }
    }
}
