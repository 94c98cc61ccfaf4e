//! Length-bounded byte fields.

use crate::config::{PWS_LOGIN_LEN, PWS_NAME_LEN, PWS_PASSWORD_LEN};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A byte string of at most `MAX` bytes.
///
/// Overlong input is rejected, never truncated, and the stored bytes are
/// returned exactly as given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct BoundedField<const MAX: usize> {
    bytes: Vec<u8>,
}

/// Slot name, up to 11 bytes.
pub type SlotName = BoundedField<PWS_NAME_LEN>;

/// Login, up to 32 bytes.
pub type SlotLogin = BoundedField<PWS_LOGIN_LEN>;

/// Password, up to 20 bytes.
pub type SlotPassword = BoundedField<PWS_PASSWORD_LEN>;

impl<const MAX: usize> BoundedField<MAX> {
    pub const MAX_LEN: usize = MAX;

    pub fn new(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX {
            return Err(Error::InvalidArgument(format!(
                "Field of {} bytes exceeds maximum width {}",
                bytes.len(),
                MAX
            )));
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl<const MAX: usize> TryFrom<Vec<u8>> for BoundedField<MAX> {
    type Error = Error;

    fn try_from(bytes: Vec<u8>) -> Result<Self> {
        Self::new(&bytes)
    }
}

impl<const MAX: usize> From<BoundedField<MAX>> for Vec<u8> {
    fn from(field: BoundedField<MAX>) -> Self {
        field.bytes
    }
}

impl<const MAX: usize> AsRef<[u8]> for BoundedField<MAX> {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
