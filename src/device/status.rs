//! Device status snapshot and its text form.

use crate::config::FirmwareVersion;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Point-in-time view of the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStatus {
    pub firmware_version: FirmwareVersion,
    pub unencrypted_read_only: bool,
    pub encrypted_volume_active: bool,
    pub hidden_volume_active: bool,
    pub password_safe_enabled: bool,
    pub new_sd_card_found: bool,
    pub hidden_volumes_defined: usize,
    pub progress: i8,
    pub user_pw_retry_count: u8,
    pub admin_pw_retry_count: u8,
}

impl StorageStatus {
    /// Render the tab-indented `Key: value` blob.
    pub fn render(&self) -> String {
        let flag = |b: bool| if b { 1 } else { 0 };
        let mut out = String::from("Storage status:\n");
        // Writing to a String cannot fail.
        let _ = writeln!(out, "\tFirmwareVersion:\t{}", self.firmware_version);
        let _ = writeln!(
            out,
            "\tReadOnlyUnencrypted: (int) {}",
            flag(self.unencrypted_read_only)
        );
        let _ = writeln!(
            out,
            "\tEncryptedVolumeActive: (int) {}",
            flag(self.encrypted_volume_active)
        );
        let _ = writeln!(
            out,
            "\tHiddenVolumeActive: (int) {}",
            flag(self.hidden_volume_active)
        );
        let _ = writeln!(
            out,
            "\tPasswordSafeEnabled: (int) {}",
            flag(self.password_safe_enabled)
        );
        let _ = writeln!(out, "\tNewSDCardFound: (int) {}", flag(self.new_sd_card_found));
        let _ = writeln!(
            out,
            "\tHiddenVolumesDefined: (int) {}",
            self.hidden_volumes_defined
        );
        let _ = writeln!(out, "\tProgress: (int) {}", self.progress);
        let _ = writeln!(out, "\tUserPwRetryCount: (int) {}", self.user_pw_retry_count);
        let _ = writeln!(out, "\tAdminPwRetryCount: (int) {}", self.admin_pw_retry_count);
        out
    }
}

impl std::fmt::Display for StorageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Parse a `Key: value` status blob into a map.
///
/// Tabs and ` (int) ` markers are stripped; lines that do not split into
/// exactly one key and one value on `:` are skipped.
pub fn parse_status(blob: &str) -> BTreeMap<String, String> {
    blob.lines()
        .filter(|line| line.contains(':'))
        .filter_map(|line| {
            let cleaned = line.replace('\t', "").replace(" (int) ", "");
            let mut parts = cleaned.split(':');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) => {
                    Some((key.trim().to_string(), value.trim().to_string()))
                }
                _ => None,
            }
        })
        .collect()
}
