//! Configuration constants and types for the storage driver.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of hidden volume slots.
pub const HIDDEN_VOLUME_SLOTS: usize = 4;

/// Number of password safe slots.
pub const PWS_SLOT_COUNT: usize = 16;

/// Maximum width of a password safe slot name.
pub const PWS_NAME_LEN: usize = 11;

/// Maximum width of a password safe login.
pub const PWS_LOGIN_LEN: usize = 32;

/// Maximum width of a password safe password.
pub const PWS_PASSWORD_LEN: usize = 20;

/// Default remaining attempts for each credential role.
pub const DEFAULT_RETRY_COUNT: u8 = 3;

/// Factory user password.
pub const DEFAULT_USER_PASSWORD: &[u8] = b"123456";

/// Factory admin password.
pub const DEFAULT_ADMIN_PASSWORD: &[u8] = b"12345678";

/// Token image magic number: "NKSI" in bytes.
pub const IMAGE_MAGIC: [u8; 4] = [0x4E, 0x4B, 0x53, 0x49];

/// Current token image version.
pub const IMAGE_VERSION: u32 = 1;

/// Argon2id parameters for image sealing.
pub mod argon2_params {
    /// Memory cost in KiB (64 MB).
    pub const MEMORY_COST: u32 = 65536;

    /// Time cost (iterations).
    pub const TIME_COST: u32 = 3;

    /// Parallelism factor.
    pub const PARALLELISM: u32 = 4;

    /// Output length in bytes (256 bits).
    pub const OUTPUT_LENGTH: usize = 32;

    /// Salt length in bytes.
    pub const SALT_LENGTH: usize = 32;

    /// Largest memory cost accepted from a config or an image header (1 GiB).
    pub const MAX_MEMORY_COST: u32 = 1 << 20;

    /// Largest accepted time cost.
    pub const MAX_TIME_COST: u32 = 64;

    /// Largest accepted parallelism.
    pub const MAX_PARALLELISM: u32 = 64;
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    /// Iterations.
    pub time_cost: u32,
    /// Lanes.
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_cost: argon2_params::MEMORY_COST,
            time_cost: argon2_params::TIME_COST,
            parallelism: argon2_params::PARALLELISM,
        }
    }
}

impl KdfParams {
    /// Check the costs against argon2's own bounds and the accepted ceilings.
    pub fn validate(&self) -> Result<()> {
        if self.memory_cost > argon2_params::MAX_MEMORY_COST
            || self.time_cost > argon2_params::MAX_TIME_COST
            || self.parallelism > argon2_params::MAX_PARALLELISM
        {
            return Err(Error::KeyDerivation(format!(
                "Costs m={} t={} p={} exceed the accepted limits",
                self.memory_cost, self.time_cost, self.parallelism
            )));
        }
        argon2::Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            Some(argon2_params::OUTPUT_LENGTH),
        )
        .map_err(|e| Error::KeyDerivation(e.to_string()))?;
        Ok(())
    }

    /// Minimal parameters, for tests and throwaway images.
    pub fn insecure_fast() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

/// Firmware version reported in the status blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
}

impl Default for FirmwareVersion {
    fn default() -> Self {
        Self { major: 0, minor: 53 }
    }
}

impl std::fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Configuration for a driver instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Require a fresh encrypted-volume unlock before every hidden volume unlock
    /// that follows a hidden volume lock. `false` reproduces shipped firmware.
    pub strict_session_requirement: bool,

    /// Admin password attempts before the counter reaches zero.
    pub admin_pw_retry_count: u8,

    /// User password attempts before the counter reaches zero.
    pub user_pw_retry_count: u8,

    /// Reported firmware version.
    pub firmware_version: FirmwareVersion,

    /// Key derivation cost for sealed images.
    pub kdf: KdfParams,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            strict_session_requirement: false,
            admin_pw_retry_count: DEFAULT_RETRY_COUNT,
            user_pw_retry_count: DEFAULT_RETRY_COUNT,
            firmware_version: FirmwareVersion::default(),
            kdf: KdfParams::default(),
        }
    }
}

impl DriverConfig {
    /// Configuration with the corrected session rule enabled.
    pub fn strict() -> Self {
        Self {
            strict_session_requirement: true,
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DriverConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.admin_pw_retry_count == 0 || self.user_pw_retry_count == 0 {
            return Err(Error::Config(
                "Retry counters must be at least 1".to_string(),
            ));
        }
        self.kdf
            .validate()
            .map_err(|e| Error::Config(format!("Invalid KDF parameters: {}", e)))?;
        Ok(())
    }
}
