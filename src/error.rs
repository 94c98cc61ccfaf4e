//! Error types for the token storage driver.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for driver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in driver operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Credential mismatch on a password-gated operation.
    #[error("Wrong password")]
    WrongPassword,

    /// The operation needs an unlocked encrypted volume or an enabled password safe.
    #[error("Operation not permitted in the current state")]
    NotUnlocked,

    /// Out-of-range index, malformed range or oversized field.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A long-running operation is in progress.
    #[error("Device busy: long-running operation in progress")]
    Busy,

    /// I/O error while accessing a token image.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Key derivation error.
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// Encryption error.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Invalid image magic number.
    #[error("Invalid token image: expected magic 'NKSI'")]
    InvalidMagic,

    /// Image format version mismatch.
    #[error("Token image version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    /// Image checksum or structure does not match its contents.
    #[error("Token image corrupted: {0}")]
    ImageCorrupted(String),

    /// No image at the given location.
    #[error("Token image not found: {0}")]
    ImageNotFound(PathBuf),

    /// An image already exists at the given location.
    #[error("Token image already exists: {0}")]
    ImageExists(PathBuf),

    /// Invalid driver configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Status codes reported back to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StatusCode {
    Ok = 0,
    Busy = 1,
    InvalidArgument = 2,
    WrongPassword = 4,
    NotUnlocked = 5,
    Unknown = 100,
}

impl StatusCode {
    /// Map an operation result to the code the transport sends back.
    pub fn from_result<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => StatusCode::Ok,
            Err(e) => StatusCode::from(e),
        }
    }

    /// Numeric wire value.
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<&Error> for StatusCode {
    fn from(e: &Error) -> Self {
        match e {
            Error::WrongPassword => StatusCode::WrongPassword,
            Error::NotUnlocked => StatusCode::NotUnlocked,
            Error::InvalidArgument(_) => StatusCode::InvalidArgument,
            Error::Busy => StatusCode::Busy,
            _ => StatusCode::Unknown,
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StatusCode::Ok => "STATUS_OK",
            StatusCode::Busy => "BUSY",
            StatusCode::InvalidArgument => "INVALID_ARGUMENT",
            StatusCode::WrongPassword => "WRONG_PASSWORD",
            StatusCode::NotUnlocked => "NOT_UNLOCKED",
            StatusCode::Unknown => "UNKNOWN_ERROR",
        };
        write!(f, "{} ({})", name, self.code())
    }
}
