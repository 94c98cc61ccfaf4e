//! Stored credential digests.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// SHA-256 digest of an opaque byte password.
///
/// Passwords carry no charset; two passwords match exactly when their bytes
/// are equal.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordDigest([u8; 32]);

impl PasswordDigest {
    /// Digest a password.
    pub fn of(password: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(password);
        Self(hasher.finalize().into())
    }

    /// Check a candidate password against this digest.
    pub fn matches(&self, candidate: &[u8]) -> bool {
        *self == Self::of(candidate)
    }
}

impl std::fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PasswordDigest({}..)", hex::encode(&self.0[..4]))
    }
}
