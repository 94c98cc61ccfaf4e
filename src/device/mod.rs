//! The token as seen by the transport: driver façade, status and persistence.

mod credentials;
mod driver;
mod image;
mod progress;
mod status;

pub use driver::{PersistedState, StorageDriver};
pub use image::TokenImage;
pub use progress::PROGRESS_IDLE;
pub use status::{parse_status, StorageStatus};
