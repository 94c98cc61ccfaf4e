//! Password safe slot storage.

use crate::config::PWS_SLOT_COUNT;
use crate::error::{Error, Result};
use crate::password::PasswordDigest;
use crate::pws::field::{SlotLogin, SlotName, SlotPassword};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One credential record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordSafeEntry {
    pub name: SlotName,
    pub login: SlotLogin,
    pub password: SlotPassword,
}

impl PasswordSafeEntry {
    /// Build an entry, validating every field width.
    pub fn new(name: &[u8], login: &[u8], password: &[u8]) -> Result<Self> {
        Ok(Self {
            name: SlotName::new(name)?,
            login: SlotLogin::new(login)?,
            password: SlotPassword::new(password)?,
        })
    }
}

/// Sixteen credential slots, readable and writable only while enabled.
///
/// Contents are durable; the enabled flag is session state and is never
/// serialized.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotStore {
    slots: [Option<PasswordSafeEntry>; PWS_SLOT_COUNT],
    #[serde(skip)]
    enabled: bool,
}

impl SlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable access for the rest of the session.
    pub fn enable(&mut self, password: &[u8], user: &PasswordDigest) -> Result<()> {
        if !user.matches(password) {
            return Err(Error::WrongPassword);
        }
        self.enabled = true;
        Ok(())
    }

    /// Enable access after the user was authenticated elsewhere.
    pub(crate) fn enable_authenticated(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Store a credential triple in `index`.
    pub fn write(&mut self, index: usize, name: &[u8], login: &[u8], password: &[u8]) -> Result<()> {
        self.require_enabled()?;
        Self::check_index(index)?;
        let entry = PasswordSafeEntry::new(name, login, password)?;
        self.slots[index] = Some(entry);
        debug!(slot = index, "Password safe slot written");
        Ok(())
    }

    /// Last written triple, or the empty record for an unwritten slot.
    pub fn read(&self, index: usize) -> Result<PasswordSafeEntry> {
        self.require_enabled()?;
        Self::check_index(index)?;
        Ok(self.slots[index].clone().unwrap_or_default())
    }

    /// Return a slot to the unwritten state.
    pub fn erase(&mut self, index: usize) -> Result<()> {
        self.require_enabled()?;
        Self::check_index(index)?;
        self.slots[index] = None;
        debug!(slot = index, "Password safe slot erased");
        Ok(())
    }

    /// Which slots hold a record.
    pub fn slot_status(&self) -> Result<[bool; PWS_SLOT_COUNT]> {
        self.require_enabled()?;
        let mut status = [false; PWS_SLOT_COUNT];
        for (flag, slot) in status.iter_mut().zip(self.slots.iter()) {
            *flag = slot.is_some();
        }
        Ok(status)
    }

    fn require_enabled(&self) -> Result<()> {
        if self.enabled {
            Ok(())
        } else {
            Err(Error::NotUnlocked)
        }
    }

    fn check_index(index: usize) -> Result<()> {
        if index >= PWS_SLOT_COUNT {
            return Err(Error::InvalidArgument(format!(
                "Password safe slot {} out of range 0..{}",
                index, PWS_SLOT_COUNT
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_store() -> SlotStore {
        let user = PasswordDigest::of(b"123456");
        let mut store = SlotStore::new();
        store.enable(b"123456", &user).unwrap();
        store
    }

    #[test]
    fn test_enable_wrong_password() {
        let user = PasswordDigest::of(b"123456");
        let mut store = SlotStore::new();

        assert!(matches!(store.enable(b"000000", &user), Err(Error::WrongPassword)));
        assert!(!store.is_enabled());
    }

    #[test]
    fn test_access_requires_enable() {
        let mut store = SlotStore::new();
        assert!(matches!(store.read(0), Err(Error::NotUnlocked)));
        assert!(matches!(
            store.write(0, b"n", b"l", b"p"),
            Err(Error::NotUnlocked)
        ));
    }

    #[test]
    fn test_write_read_full_width() {
        let mut store = enabled_store();
        let name = b"slotname012";
        let login = b"login012345678901234567890123456";
        let password = b"pass0123456789012345";

        store.write(15, name, login, password).unwrap();
        let entry = store.read(15).unwrap();

        assert_eq!(entry.name.as_bytes(), name);
        assert_eq!(entry.login.as_bytes(), login);
        assert_eq!(entry.password.as_bytes(), password);
    }

    #[test]
    fn test_unwritten_slot_is_empty() {
        let store = enabled_store();
        let entry = store.read(3).unwrap();
        assert!(entry.name.is_empty());
        assert!(entry.login.is_empty());
        assert!(entry.password.is_empty());
    }

    #[test]
    fn test_oversized_write_leaves_slot_untouched() {
        let mut store = enabled_store();
        store.write(1, b"mail", b"me", b"secret").unwrap();

        let result = store.write(1, b"mail", b"me", &[b'x'; 21]);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert_eq!(store.read(1).unwrap().password.as_bytes(), b"secret");
    }

    #[test]
    fn test_index_out_of_range() {
        let mut store = enabled_store();
        assert!(matches!(
            store.write(16, b"n", b"l", b"p"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(store.read(16).is_err());
    }

    #[test]
    fn test_erase_and_status() {
        let mut store = enabled_store();
        store.write(0, b"a", b"b", b"c").unwrap();
        store.write(7, b"d", b"e", b"f").unwrap();

        let status = store.slot_status().unwrap();
        assert!(status[0] && status[7]);
        assert_eq!(status.iter().filter(|s| **s).count(), 2);

        store.erase(0).unwrap();
        assert!(!store.slot_status().unwrap()[0]);
        assert_eq!(store.read(0).unwrap(), PasswordSafeEntry::default());
    }

    #[test]
    fn test_enabled_flag_not_serialized() {
        let mut store = enabled_store();
        store.write(2, b"n", b"l", b"p").unwrap();

        let bytes = bincode::serialize(&store).unwrap();
        let mut restored: SlotStore = bincode::deserialize(&bytes).unwrap();

        assert!(!restored.is_enabled());
        restored.enable_authenticated();
        assert_eq!(restored.read(2).unwrap().login.as_bytes(), b"l");
    }
}
