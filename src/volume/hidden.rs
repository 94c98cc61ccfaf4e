//! Hidden volume slot definitions.

use crate::config::HIDDEN_VOLUME_SLOTS;
use crate::error::{Error, Result};
use crate::password::PasswordDigest;
use crate::volume::range::VolumeRange;
use serde::{Deserialize, Serialize};

/// A defined hidden volume: its region and the digest of its password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiddenVolumeSlot {
    /// Region reserved within the encrypted volume.
    pub range: VolumeRange,
    password: PasswordDigest,
}

impl HiddenVolumeSlot {
    pub fn new(range: VolumeRange, password: &[u8]) -> Self {
        Self {
            range,
            password: PasswordDigest::of(password),
        }
    }

    /// Check a password against this slot.
    pub fn unlocks_with(&self, password: &[u8]) -> bool {
        self.password.matches(password)
    }
}

/// Up to four hidden volume definitions, indexed 0..4.
///
/// Slots are overwritten freely and never removed; overlapping ranges are
/// the caller's concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HiddenVolumeTable {
    slots: [Option<HiddenVolumeSlot>; HIDDEN_VOLUME_SLOTS],
}

impl HiddenVolumeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define or redefine the hidden volume at `index`.
    pub fn write(&mut self, index: usize, range: VolumeRange, password: &[u8]) -> Result<()> {
        Self::check_index(index)?;
        self.slots[index] = Some(HiddenVolumeSlot::new(range, password));
        Ok(())
    }

    /// Get the definition at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&HiddenVolumeSlot> {
        self.slots.get(index).and_then(|s| s.as_ref())
    }

    /// Lowest index whose password matches.
    pub fn find_by_password(&self, password: &[u8]) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.as_ref()
                .map(|s| s.unlocks_with(password))
                .unwrap_or(false)
        })
    }

    /// Number of defined hidden volumes.
    pub fn defined_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Iterate over defined slots with their index.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &HiddenVolumeSlot)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i, s)))
    }

    /// Pairs of defined slots whose ranges share part of the volume.
    pub fn overlapping_pairs(&self) -> Vec<(usize, usize)> {
        let defined: Vec<_> = self.iter().collect();
        let mut pairs = Vec::new();
        for (n, (a, slot_a)) in defined.iter().enumerate() {
            for (b, slot_b) in &defined[n + 1..] {
                if slot_a.range.overlaps(&slot_b.range) {
                    pairs.push((*a, *b));
                }
            }
        }
        pairs
    }

    /// Validate a hidden volume slot index.
    pub fn check_index(index: usize) -> Result<()> {
        if index >= HIDDEN_VOLUME_SLOTS {
            return Err(Error::InvalidArgument(format!(
                "Hidden volume slot {} out of range 0..{}",
                index, HIDDEN_VOLUME_SLOTS
            )));
        }
        Ok(())
    }
}
