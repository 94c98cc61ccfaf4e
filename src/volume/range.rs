//! Hidden volume region within the encrypted volume.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Upper bound of a range, in percent of the encrypted volume.
pub const MAX_PERCENT: u8 = 100;

/// A `[start, end)` percentage interval over the encrypted volume capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VolumeRange {
    start_percent: u8,
    end_percent: u8,
}

impl VolumeRange {
    /// Create a range, requiring `start < end <= 100`.
    pub fn new(start_percent: u8, end_percent: u8) -> Result<Self> {
        if start_percent >= end_percent {
            return Err(Error::InvalidArgument(format!(
                "Volume range start {} must be below end {}",
                start_percent, end_percent
            )));
        }
        if end_percent > MAX_PERCENT {
            return Err(Error::InvalidArgument(format!(
                "Volume range end {} exceeds {}%",
                end_percent, MAX_PERCENT
            )));
        }
        Ok(Self {
            start_percent,
            end_percent,
        })
    }

    pub fn start_percent(&self) -> u8 {
        self.start_percent
    }

    pub fn end_percent(&self) -> u8 {
        self.end_percent
    }

    /// Width of the range in percent.
    pub fn width(&self) -> u8 {
        self.end_percent - self.start_percent
    }

    /// Whether two ranges share any part of the volume.
    ///
    /// Informational only: overlapping hidden volumes are accepted.
    pub fn overlaps(&self, other: &VolumeRange) -> bool {
        self.start_percent < other.end_percent && other.start_percent < self.end_percent
    }
}

impl std::fmt::Display for VolumeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}%, {}%)", self.start_percent, self.end_percent)
    }
}
