//! Encrypted and hidden volume model.
//!
//! Hidden volumes are carved from percentage ranges of the encrypted volume
//! and selected by password. The state machine tracks which of them, if any,
//! is currently mounted.

mod hidden;
mod range;
mod state;

pub use hidden::{HiddenVolumeSlot, HiddenVolumeTable};
pub use range::VolumeRange;
pub use state::{DeviceState, EncryptedSession, VolumeStateMachine};
