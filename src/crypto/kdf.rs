//! Argon2id key derivation for image sealing.

use crate::config::{argon2_params, KdfParams};
use crate::error::{Error, Result};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;

/// Key derivation using Argon2id.
#[derive(Debug, Clone)]
pub struct KeyDerivation {
    salt: [u8; argon2_params::SALT_LENGTH],
    params: KdfParams,
}

impl KeyDerivation {
    /// Create a new KDF with a random salt.
    pub fn new(params: KdfParams) -> Self {
        let mut salt = [0u8; argon2_params::SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        Self { salt, params }
    }

    /// Create a KDF from a stored salt (for opening an image).
    pub fn from_salt(salt: [u8; argon2_params::SALT_LENGTH], params: KdfParams) -> Self {
        Self { salt, params }
    }

    /// Get the salt for storage.
    pub fn salt(&self) -> &[u8; argon2_params::SALT_LENGTH] {
        &self.salt
    }

    pub fn params(&self) -> KdfParams {
        self.params
    }

    /// Derive a 256-bit key from a byte password.
    pub fn derive_key(&self, password: &[u8]) -> Result<[u8; 32]> {
        let params = Params::new(
            self.params.memory_cost,
            self.params.time_cost,
            self.params.parallelism,
            Some(argon2_params::OUTPUT_LENGTH),
        )
        .map_err(|e| Error::KeyDerivation(e.to_string()))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = [0u8; 32];
        argon2
            .hash_password_into(password, &self.salt, &mut key)
            .map_err(|e| Error::KeyDerivation(e.to_string()))?;

        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_derivation_deterministic() {
        let kdf = KeyDerivation::from_salt([1u8; 32], KdfParams::insecure_fast());

        let key1 = kdf.derive_key(b"123456").unwrap();
        let key2 = kdf.derive_key(b"123456").unwrap();

        assert_eq!(key1, key2);
    }

    #[test]
    fn test_different_passwords_different_keys() {
        let kdf = KeyDerivation::from_salt([2u8; 32], KdfParams::insecure_fast());

        let key1 = kdf.derive_key(b"123456").unwrap();
        let key2 = kdf.derive_key(b"1234567").unwrap();

        assert_ne!(key1, key2);
    }

    #[test]
    fn test_new_generates_random_salt() {
        let kdf1 = KeyDerivation::new(KdfParams::insecure_fast());
        let kdf2 = KeyDerivation::new(KdfParams::insecure_fast());

        assert_ne!(kdf1.salt(), kdf2.salt());
    }

    #[test]
    fn test_invalid_params() {
        let params = KdfParams {
            memory_cost: 1024,
            time_cost: 0,
            parallelism: 1,
        };
        let kdf = KeyDerivation::from_salt([0u8; 32], params);
        assert!(matches!(kdf.derive_key(b"pw"), Err(Error::KeyDerivation(_))));
    }
}
