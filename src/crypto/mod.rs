//! Cryptographic operations for sealed token images.
//!
//! This module provides:
//! - AES-256-GCM authenticated encryption
//! - Argon2id password-based key derivation

mod cipher;
mod kdf;

pub use cipher::{Cipher, NONCE_SIZE, TAG_SIZE};
pub use kdf::KeyDerivation;
