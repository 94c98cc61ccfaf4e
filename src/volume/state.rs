//! Lock/unlock sequencing for the encrypted and hidden volumes.

use crate::error::{Error, Result};
use crate::password::PasswordDigest;
use crate::volume::hidden::HiddenVolumeTable;
use crate::volume::range::VolumeRange;
use tracing::{debug, info};

/// Encrypted volume session while the device is unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptedSession {
    /// Device unlocked, encrypted volume not yet unlocked this round.
    Closed,
    /// Encrypted volume unlocked.
    Open {
        /// Hidden volume currently mounted, by slot index.
        mounted_hidden: Option<usize>,
        /// A mounted hidden volume was locked since the last encrypted unlock.
        hidden_cycle_spent: bool,
    },
}

/// Device lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Locked,
    Unlocked(EncryptedSession),
}

/// Tracks the device, encrypted volume and hidden volume sessions.
///
/// Only session flags live here besides the hidden volume table; locking
/// never touches persisted definitions.
#[derive(Debug, Clone)]
pub struct VolumeStateMachine {
    state: DeviceState,
    hidden: HiddenVolumeTable,
    strict_session_requirement: bool,
}

impl VolumeStateMachine {
    /// Create a locked state machine over existing hidden volume definitions.
    pub fn new(hidden: HiddenVolumeTable, strict_session_requirement: bool) -> Self {
        Self {
            state: DeviceState::Locked,
            hidden,
            strict_session_requirement,
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn hidden_volumes(&self) -> &HiddenVolumeTable {
        &self.hidden
    }

    pub fn is_strict(&self) -> bool {
        self.strict_session_requirement
    }

    pub fn is_device_unlocked(&self) -> bool {
        matches!(self.state, DeviceState::Unlocked(_))
    }

    pub fn is_encrypted_unlocked(&self) -> bool {
        matches!(self.state, DeviceState::Unlocked(EncryptedSession::Open { .. }))
    }

    /// Slot index of the mounted hidden volume.
    pub fn mounted_hidden(&self) -> Option<usize> {
        match self.state {
            DeviceState::Unlocked(EncryptedSession::Open { mounted_hidden, .. }) => mounted_hidden,
            _ => None,
        }
    }

    /// Reset every session. Always succeeds.
    pub fn lock_device(&mut self) {
        if self.state != DeviceState::Locked {
            info!(previous = ?self.state, "Device locked");
        }
        self.state = DeviceState::Locked;
    }

    /// Mark the device unlocked by the user without opening the encrypted volume.
    ///
    /// An already open encrypted session is kept.
    pub fn unlock_device(&mut self) {
        if self.state == DeviceState::Locked {
            self.state = DeviceState::Unlocked(EncryptedSession::Closed);
        }
    }

    /// Unlock the encrypted volume. Legal from any state; clears any mounted
    /// hidden volume.
    pub fn unlock_encrypted(&mut self, password: &[u8], user: &PasswordDigest) -> Result<()> {
        if !user.matches(password) {
            return Err(Error::WrongPassword);
        }
        self.state = DeviceState::Unlocked(EncryptedSession::Open {
            mounted_hidden: None,
            hidden_cycle_spent: false,
        });
        info!("Encrypted volume unlocked");
        Ok(())
    }

    /// Close the encrypted session while the device stays unlocked.
    pub fn lock_encrypted_volume(&mut self) {
        if let DeviceState::Unlocked(session) = &mut self.state {
            *session = EncryptedSession::Closed;
            info!("Encrypted volume locked");
        }
    }

    /// Define or redefine a hidden volume. Does not change what is mounted.
    pub fn create_hidden_volume(
        &mut self,
        index: usize,
        range: VolumeRange,
        password: &[u8],
    ) -> Result<()> {
        self.require_encrypted()?;
        self.hidden.write(index, range, password)?;
        info!(slot = index, %range, "Hidden volume created");
        Ok(())
    }

    /// Mount the lowest-indexed hidden volume whose password matches.
    pub fn unlock_hidden_volume(&mut self, password: &[u8]) -> Result<usize> {
        let spent = match self.state {
            DeviceState::Unlocked(EncryptedSession::Open {
                hidden_cycle_spent, ..
            }) => hidden_cycle_spent,
            _ => return Err(Error::NotUnlocked),
        };

        if self.strict_session_requirement && spent {
            debug!("Hidden volume unlock refused: encrypted session not refreshed");
            return Err(Error::NotUnlocked);
        }

        let index = self
            .hidden
            .find_by_password(password)
            .ok_or(Error::WrongPassword)?;

        let (mounted_hidden, _) = self.open_session_mut()?;
        *mounted_hidden = Some(index);
        info!(slot = index, "Hidden volume unlocked");
        Ok(index)
    }

    /// Unmount the hidden volume, if any. The encrypted volume stays unlocked.
    pub fn lock_hidden_volume(&mut self) -> Result<()> {
        let (mounted_hidden, hidden_cycle_spent) = self.open_session_mut()?;
        if let Some(index) = mounted_hidden.take() {
            info!(slot = index, "Hidden volume locked");
            *hidden_cycle_spent = true;
        }
        Ok(())
    }

    fn require_encrypted(&self) -> Result<()> {
        if self.is_encrypted_unlocked() {
            Ok(())
        } else {
            Err(Error::NotUnlocked)
        }
    }

    fn open_session_mut(&mut self) -> Result<(&mut Option<usize>, &mut bool)> {
        match &mut self.state {
            DeviceState::Unlocked(EncryptedSession::Open {
                mounted_hidden,
                hidden_cycle_spent,
            }) => Ok((mounted_hidden, hidden_cycle_spent)),
            _ => Err(Error::NotUnlocked),
        }
    }
}
