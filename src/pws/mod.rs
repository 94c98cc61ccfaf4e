//! Password safe: sixteen fixed-width credential slots.

mod field;
mod store;

pub use field::{BoundedField, SlotLogin, SlotName, SlotPassword};
pub use store::{PasswordSafeEntry, SlotStore};
