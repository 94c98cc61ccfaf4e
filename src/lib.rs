//! Storage Token Driver
//!
//! Host-side model of a USB security storage token that multiplexes an
//! encrypted volume, up to four hidden volumes and a sixteen-slot password
//! safe onto one SD card.
//!
//! # Features
//!
//! - **Volume state machine**: device lock, encrypted volume session and the
//!   mounted hidden volume, with the legal transition graph enforced
//! - **Hidden volumes**: percentage ranges of the encrypted volume, selected by
//!   password (first match wins, overlap allowed)
//! - **Password safe**: fixed-width slot name / login / password records that
//!   survive every lock cycle
//! - **Sealed images**: durable state persisted with Argon2id + AES-256-GCM
//!
//! # Architecture
//!
//! ```text
//! VolumeRange → HiddenVolumeTable → VolumeStateMachine ┐
//!                                          SlotStore ──┴→ StorageDriver
//! ```
//!
//! # Example
//!
//! ```rust
//! use token_storage::{DriverConfig, StorageDriver};
//!
//! let mut token = StorageDriver::new(DriverConfig::default());
//! token.unlock_encrypted_volume(b"123456").unwrap();
//! token.create_hidden_volume(0, 20, 21, b"hiddenpassword").unwrap();
//! assert_eq!(token.unlock_hidden_volume(b"hiddenpassword").unwrap(), 0);
//! ```

pub mod config;
pub mod crypto;
pub mod device;
pub mod error;
pub mod password;
pub mod pws;
pub mod volume;

pub use config::DriverConfig;
pub use device::{StorageDriver, StorageStatus, TokenImage};
pub use error::{Error, Result, StatusCode};
