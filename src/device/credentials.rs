//! User and admin credentials with their retry counters.

use crate::config::{DriverConfig, DEFAULT_ADMIN_PASSWORD, DEFAULT_USER_PASSWORD};
use crate::error::{Error, Result};
use crate::password::PasswordDigest;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Credential role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

/// Stored credential digests and remaining attempts per role.
///
/// Counters only record failures; no lockout is enforced at this layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    user: PasswordDigest,
    admin: PasswordDigest,
    user_retries: u8,
    admin_retries: u8,
}

impl Credentials {
    /// Factory credentials.
    pub fn factory(config: &DriverConfig) -> Self {
        Self {
            user: PasswordDigest::of(DEFAULT_USER_PASSWORD),
            admin: PasswordDigest::of(DEFAULT_ADMIN_PASSWORD),
            user_retries: config.user_pw_retry_count,
            admin_retries: config.admin_pw_retry_count,
        }
    }

    pub fn user(&self) -> &PasswordDigest {
        &self.user
    }

    pub fn retries(&self, role: Role) -> u8 {
        match role {
            Role::User => self.user_retries,
            Role::Admin => self.admin_retries,
        }
    }

    /// Check a password for `role`, updating its counter.
    pub fn verify(&mut self, role: Role, password: &[u8], config: &DriverConfig) -> Result<()> {
        let matched = match role {
            Role::User => self.user.matches(password),
            Role::Admin => self.admin.matches(password),
        };
        self.record_attempt(role, matched, config);
        if matched {
            Ok(())
        } else {
            Err(Error::WrongPassword)
        }
    }

    /// Update the counter of `role` after a check made elsewhere.
    pub fn record_attempt(&mut self, role: Role, success: bool, config: &DriverConfig) {
        let (counter, initial) = match role {
            Role::User => (&mut self.user_retries, config.user_pw_retry_count),
            Role::Admin => (&mut self.admin_retries, config.admin_pw_retry_count),
        };
        if success {
            *counter = initial;
        } else {
            *counter = counter.saturating_sub(1);
            warn!(?role, remaining = *counter, "Wrong password");
        }
    }

    /// Replace the password of `role` after verifying the old one.
    pub fn change(
        &mut self,
        role: Role,
        old: &[u8],
        new: &[u8],
        config: &DriverConfig,
    ) -> Result<()> {
        if new.is_empty() {
            return Err(Error::InvalidArgument(
                "New password must not be empty".to_string(),
            ));
        }
        self.verify(role, old, config)?;
        let digest = PasswordDigest::of(new);
        match role {
            Role::User => self.user = digest,
            Role::Admin => self.admin = digest,
        }
        Ok(())
    }
}
