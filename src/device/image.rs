//! Sealed on-disk token image.
//!
//! Layout: a fixed plaintext header followed by the sealed body.
//!
//! ```text
//! magic(4) | version(4) | salt(32) | m_cost(4) | t_cost(4) | p_cost(4) | body_len(4) | sha256(32) | body
//! ```
//!
//! The body is the `bincode`-serialized [`PersistedState`] sealed with
//! AES-256-GCM under an Argon2id key derived from the user password. The
//! checksum covers every header field before it plus the body. Session
//! state is never written, so an opened image always starts locked.

use crate::config::{argon2_params, DriverConfig, KdfParams, IMAGE_MAGIC, IMAGE_VERSION};
use crate::crypto::{Cipher, KeyDerivation};
use crate::device::driver::{PersistedState, StorageDriver};
use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Image header.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ImageHeader {
    magic: [u8; 4],
    version: u32,
    salt: [u8; argon2_params::SALT_LENGTH],
    kdf: KdfParams,
    body_length: u32,
    checksum: [u8; 32],
}

impl ImageHeader {
    const SIZE: usize = 4 + 4 + 32 + 4 + 4 + 4 + 4 + 32; // 88 bytes

    /// Bytes of the fields covered by the checksum.
    const COVERED: usize = Self::SIZE - 32;

    fn covered_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.magic);
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(&self.salt);
        bytes.extend_from_slice(&self.kdf.memory_cost.to_le_bytes());
        bytes.extend_from_slice(&self.kdf.time_cost.to_le_bytes());
        bytes.extend_from_slice(&self.kdf.parallelism.to_le_bytes());
        bytes.extend_from_slice(&self.body_length.to_le_bytes());
        bytes
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.covered_bytes();
        bytes.extend_from_slice(&self.checksum);
        bytes
    }

    fn compute_checksum(&self, body: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.covered_bytes());
        hasher.update(body);
        hasher.finalize().into()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(Error::ImageCorrupted("Header too short".to_string()));
        }

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        if magic != IMAGE_MAGIC {
            return Err(Error::InvalidMagic);
        }

        let version = read_u32(bytes, 4);
        if version != IMAGE_VERSION {
            return Err(Error::VersionMismatch {
                expected: IMAGE_VERSION,
                found: version,
            });
        }

        let mut salt = [0u8; argon2_params::SALT_LENGTH];
        salt.copy_from_slice(&bytes[8..40]);

        let kdf = KdfParams {
            memory_cost: read_u32(bytes, 40),
            time_cost: read_u32(bytes, 44),
            parallelism: read_u32(bytes, 48),
        };
        kdf.validate()
            .map_err(|e| Error::ImageCorrupted(format!("Header KDF parameters: {}", e)))?;
        let body_length = read_u32(bytes, 52);

        let mut checksum = [0u8; 32];
        checksum.copy_from_slice(&bytes[Self::COVERED..Self::SIZE]);

        Ok(Self {
            magic,
            version,
            salt,
            kdf,
            body_length,
            checksum,
        })
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// A token image in memory: verified header plus sealed body.
#[derive(Debug, Clone)]
pub struct TokenImage {
    header: ImageHeader,
    body: Vec<u8>,
}

impl TokenImage {
    /// Seal `state` under `user_password`.
    pub fn seal(state: &PersistedState, user_password: &[u8], kdf: KdfParams) -> Result<Self> {
        let kdf = KeyDerivation::new(kdf);
        let key = kdf.derive_key(user_password)?;

        let plaintext = bincode::serialize(state)?;
        let body = Cipher::new(&key).encrypt(&plaintext)?;

        let mut header = ImageHeader {
            magic: IMAGE_MAGIC,
            version: IMAGE_VERSION,
            salt: *kdf.salt(),
            kdf: kdf.params(),
            body_length: body.len() as u32,
            checksum: [0u8; 32],
        };
        header.checksum = header.compute_checksum(&body);

        Ok(Self { header, body })
    }

    /// Decrypt the body. A wrong password yields [`Error::WrongPassword`].
    pub fn unseal(&self, user_password: &[u8]) -> Result<PersistedState> {
        let kdf = KeyDerivation::from_salt(self.header.salt, self.header.kdf);
        let key = kdf.derive_key(user_password)?;

        let plaintext = Cipher::new(&key).decrypt(&self.body)?;
        let state: PersistedState = bincode::deserialize(&plaintext)?;
        Ok(state)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header.to_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }

    /// Parse and verify an image without decrypting it.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = ImageHeader::from_bytes(bytes)?;
        let body = &bytes[ImageHeader::SIZE..];

        if body.len() != header.body_length as usize {
            return Err(Error::ImageCorrupted(format!(
                "Body length {} does not match header {}",
                body.len(),
                header.body_length
            )));
        }
        if header.compute_checksum(body) != header.checksum {
            return Err(Error::ImageCorrupted("Checksum mismatch".to_string()));
        }

        Ok(Self {
            header,
            body: body.to_vec(),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ImageNotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Write atomically: to a sibling temp file, then rename over `path`.
    pub fn store(&self, path: &Path) -> Result<()> {
        let tmp = temp_path(path);
        let written =
            std::fs::write(&tmp, self.to_bytes()).and_then(|()| std::fs::rename(&tmp, path));
        if let Err(e) = written {
            if let Err(cleanup) = std::fs::remove_file(&tmp) {
                debug!(path = %tmp.display(), error = %cleanup, "Temp image not removed");
            }
            return Err(e.into());
        }
        debug!(path = %path.display(), "Token image written");
        Ok(())
    }

    /// Create a factory-state image at `path` and return its driver.
    pub fn create(path: &Path, config: DriverConfig) -> Result<StorageDriver> {
        config.validate()?;
        if path.exists() {
            return Err(Error::ImageExists(path.to_path_buf()));
        }

        let driver = StorageDriver::new(config);
        Self::save(path, &driver, crate::config::DEFAULT_USER_PASSWORD)?;
        info!(path = %path.display(), "Token image created");
        Ok(driver)
    }

    /// Open the image at `path` as a locked driver.
    pub fn open(path: &Path, user_password: &[u8], config: DriverConfig) -> Result<StorageDriver> {
        config.validate()?;
        let state = Self::load(path)?.unseal(user_password)?;
        Ok(StorageDriver::from_persisted(state, config))
    }

    /// Persist the durable state of `driver` under its current user password.
    pub fn save(path: &Path, driver: &StorageDriver, user_password: &[u8]) -> Result<()> {
        if !driver.is_user_password(user_password) {
            return Err(Error::WrongPassword);
        }
        let image = Self::seal(&driver.persisted_state(), user_password, driver.config().kdf)?;
        image.store(path)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
