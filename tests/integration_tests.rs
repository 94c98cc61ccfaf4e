//! End-to-end driver scenarios: hidden volume sequencing and password safe persistence.

use token_storage::config::{DEFAULT_ADMIN_PASSWORD, DEFAULT_USER_PASSWORD};
use token_storage::device::parse_status;
use token_storage::volume::{DeviceState, EncryptedSession};
use token_storage::{DriverConfig, Error, StatusCode, StorageDriver};

const USER: &[u8] = DEFAULT_USER_PASSWORD;
const ADMIN: &[u8] = DEFAULT_ADMIN_PASSWORD;
const PWS_SLOT_COUNT: usize = 16;

/// Hidden volume password for slot `i`.
fn p(i: usize) -> Vec<u8> {
    format!("hiddenpassword{}", i).into_bytes()
}

/// Range bounds used for slot `i`: `[20 + 10i, 20 + 10i + i + 1)`.
fn bounds(i: usize) -> (u8, u8) {
    let start = 20 + i as u8 * 10;
    (start, start + i as u8 + 1)
}

/// Pad `prefix + suffix` with digits to exactly `width` bytes.
fn fill(prefix: &str, suffix: &str, width: usize) -> Vec<u8> {
    let mut s = format!("{}{}", prefix, suffix);
    let digits = "1234567890".repeat(4);
    s.push_str(&digits[..width - s.len()]);
    assert_eq!(s.len(), width);
    s.into_bytes()
}

fn slot_name(i: usize) -> Vec<u8> {
    fill("slotname", &i.to_string(), 11)
}

fn slot_login(i: usize) -> Vec<u8> {
    fill("login", &i.to_string(), 32)
}

fn slot_password(i: usize) -> Vec<u8> {
    fill("pass", &i.to_string(), 20)
}

fn driver(config: DriverConfig) -> StorageDriver {
    let mut d = StorageDriver::new(config);
    d.lock_device();
    d
}

fn create_hidden(d: &mut StorageDriver, i: usize) {
    let (start, end) = bounds(i);
    d.create_hidden_volume(i, start, end, &p(i))
        .expect("Failed to create hidden volume");
}

fn check_pws(d: &StorageDriver) {
    for i in 0..PWS_SLOT_COUNT {
        let entry = d.password_safe_slot(i).expect("Failed to read slot");
        assert_eq!(entry.name.as_bytes(), slot_name(i).as_slice());
        assert_eq!(entry.login.as_bytes(), slot_login(i).as_slice());
        assert_eq!(entry.password.as_bytes(), slot_password(i).as_slice());
    }
}

fn check_volumes(d: &mut StorageDriver, count: usize) {
    for i in 0..count {
        assert_eq!(d.unlock_hidden_volume(&p(i)).unwrap(), i);
        d.lock_hidden_volume().unwrap();
    }
}

#[test]
fn test_encrypted_volume_unlock() {
    let mut d = driver(DriverConfig::default());
    d.unlock_encrypted_volume(USER).expect("Failed to unlock");

    assert!(d.is_encrypted_volume_unlocked());
    assert_eq!(d.mounted_hidden_volume(), None);
}

#[test]
fn test_encrypted_volume_unlock_hidden() {
    let mut d = driver(DriverConfig::default());
    d.unlock_encrypted_volume(USER).unwrap();
    d.create_hidden_volume(0, 20, 21, b"hiddenpassword").unwrap();

    assert_eq!(d.unlock_hidden_volume(b"hiddenpassword").unwrap(), 0);
    assert_eq!(d.mounted_hidden_volume(), Some(0));
}

#[test]
fn test_setup_multiple_hidden_with_device_lock() {
    let mut d = driver(DriverConfig::default());
    d.unlock_encrypted_volume(USER).unwrap();
    for i in 0..4 {
        create_hidden(&mut d, i);
    }

    for i in 0..4 {
        d.lock_device();
        d.unlock_encrypted_volume(USER).unwrap();
        assert_eq!(d.unlock_hidden_volume(&p(i)).unwrap(), i);
    }
}

#[test]
fn test_setup_multiple_hidden_without_device_lock() {
    for volumes in 1..=4 {
        let mut d = driver(DriverConfig::default());
        d.unlock_encrypted_volume(USER).unwrap();
        for i in 0..volumes {
            create_hidden(&mut d, i);
        }

        d.lock_encrypted_volume().unwrap();
        d.unlock_encrypted_volume(USER).unwrap();

        check_volumes(&mut d, volumes);
    }
}

#[test]
fn test_setup_multiple_hidden_unlock_at_once() {
    for volumes in 1..=4 {
        let mut d = driver(DriverConfig::default());
        d.unlock_encrypted_volume(USER).unwrap();
        for i in 0..volumes {
            create_hidden(&mut d, i);
            d.unlock_hidden_volume(&p(i)).unwrap();
            d.lock_hidden_volume().unwrap();
        }

        d.lock_encrypted_volume().unwrap();
        d.unlock_encrypted_volume(USER).unwrap();

        check_volumes(&mut d, volumes);
    }
}

#[test]
fn test_setup_one_hidden_each_slot() {
    for slot in 0..4 {
        let mut d = driver(DriverConfig::default());
        d.unlock_encrypted_volume(USER).unwrap();
        create_hidden(&mut d, slot);
        d.unlock_hidden_volume(&p(slot)).unwrap();
        d.lock_hidden_volume().unwrap();

        d.lock_encrypted_volume().unwrap();
        d.unlock_encrypted_volume(USER).unwrap();

        for _ in 0..3 {
            assert_eq!(d.unlock_hidden_volume(&p(slot)).unwrap(), slot);
            d.lock_hidden_volume().unwrap();
        }
    }
}

#[test]
fn test_overlapping_hidden_volumes_accepted() {
    let mut d = driver(DriverConfig::default());
    d.unlock_encrypted_volume(USER).unwrap();
    for (i, (start, end)) in [(20, 31), (30, 42), (40, 54), (50, 67)].into_iter().enumerate() {
        d.create_hidden_volume(i, start, end, &p(i)).unwrap();
    }
    assert_eq!(d.hidden_volumes().defined_count(), 4);
}

#[test]
fn test_unknown_hidden_password() {
    let mut d = driver(DriverConfig::default());
    d.unlock_encrypted_volume(USER).unwrap();
    create_hidden(&mut d, 0);

    let result = d.unlock_hidden_volume(b"hiddenpassword7");
    assert_eq!(StatusCode::from_result(&result), StatusCode::WrongPassword);
}

#[test]
fn test_password_safe_survives_volume_cycles() {
    let volumes = 4;
    let mut d = driver(DriverConfig::default());

    d.enable_password_safe(USER).unwrap();
    for i in 0..PWS_SLOT_COUNT {
        d.write_password_safe_slot(i, &slot_name(i), &slot_login(i), &slot_password(i))
            .expect("Failed to write slot");
    }
    check_pws(&d);

    d.lock_device();
    d.unlock_encrypted_volume(USER).unwrap();
    for i in 0..volumes {
        create_hidden(&mut d, i);
        d.unlock_hidden_volume(&p(i)).unwrap();
        d.lock_hidden_volume().unwrap();
    }

    d.lock_encrypted_volume().unwrap();
    d.unlock_encrypted_volume(USER).unwrap();

    check_volumes(&mut d, volumes);
    check_pws(&d);
    check_volumes(&mut d, volumes);
    check_pws(&d);

    for _ in 0..2 {
        d.lock_device();
        d.unlock_encrypted_volume(USER).unwrap();
        check_volumes(&mut d, volumes);
        check_pws(&d);
    }
}

#[test]
fn test_hidden_volume_repeated_unlock_permissive() {
    let volumes = 4;
    let mut d = driver(DriverConfig::default());
    d.unlock_encrypted_volume(USER).unwrap();
    for i in 0..volumes {
        create_hidden(&mut d, i);
        d.unlock_hidden_volume(&p(i)).unwrap();
        d.lock_hidden_volume().unwrap();
    }

    d.lock_encrypted_volume().unwrap();
    d.unlock_encrypted_volume(USER).unwrap();
    for i in 0..volumes {
        d.unlock_encrypted_volume(USER).unwrap();
        d.unlock_hidden_volume(&p(i)).unwrap();
        d.lock_hidden_volume().unwrap();
    }
}

#[test]
fn test_hidden_volume_repeated_unlock_strict() {
    let volumes = 4;
    let mut d = driver(DriverConfig::strict());
    d.unlock_encrypted_volume(USER).unwrap();
    for i in 0..volumes {
        create_hidden(&mut d, i);
    }

    for i in 0..volumes {
        d.unlock_encrypted_volume(USER).unwrap();
        d.unlock_hidden_volume(&p(i)).unwrap();
        d.lock_hidden_volume().unwrap();
    }

    // Without a fresh encrypted unlock the next cycle is refused.
    assert!(matches!(d.unlock_hidden_volume(&p(0)), Err(Error::NotUnlocked)));
}

#[test]
fn test_strict_rejects_back_to_back_hidden_cycles() {
    let mut d = driver(DriverConfig::strict());
    d.unlock_encrypted_volume(USER).unwrap();
    create_hidden(&mut d, 0);
    create_hidden(&mut d, 1);

    d.unlock_hidden_volume(&p(0)).unwrap();
    d.lock_hidden_volume().unwrap();
    let result = d.unlock_hidden_volume(&p(1));
    assert_eq!(StatusCode::from_result(&result), StatusCode::NotUnlocked);
}

#[test]
fn test_locked_device_rejects_hidden_operations() {
    let mut d = driver(DriverConfig::default());
    assert!(matches!(
        d.create_hidden_volume(0, 20, 21, b"h"),
        Err(Error::NotUnlocked)
    ));
    assert!(matches!(d.unlock_hidden_volume(b"h"), Err(Error::NotUnlocked)));
    assert!(matches!(d.lock_hidden_volume(), Err(Error::NotUnlocked)));
    assert!(matches!(d.password_safe_slot(0), Err(Error::NotUnlocked)));
}

#[test]
fn test_lock_encrypted_keeps_device_unlocked() {
    let mut d = driver(DriverConfig::default());
    d.unlock_encrypted_volume(USER).unwrap();
    create_hidden(&mut d, 0);
    d.unlock_hidden_volume(&p(0)).unwrap();

    d.lock_encrypted_volume().unwrap();
    assert_eq!(
        d.device_state(),
        DeviceState::Unlocked(EncryptedSession::Closed)
    );
    assert!(matches!(
        d.create_hidden_volume(1, 30, 32, &p(1)),
        Err(Error::NotUnlocked)
    ));
}

#[test]
fn test_status_reports_admin_retry_count() {
    let d = driver(DriverConfig::default());
    let status = parse_status(&d.status().render());

    assert_eq!(status["AdminPwRetryCount"].parse::<u8>().unwrap(), 3);
    assert_eq!(status["FirmwareVersion"], "0.53");
}

#[test]
fn test_busy_progress_on_idle() {
    let d = driver(DriverConfig::default());
    assert_eq!(d.progress_bar_value(), -1);
}

#[test]
fn test_fill_sd_card_progress() {
    let mut d = driver(DriverConfig::default());
    d.fill_sd_card(ADMIN).unwrap();

    let mut reported = 0;
    while d.progress_bar_value() != -1 {
        let value = d.progress_bar_value();
        assert!((0..=100).contains(&value));
        assert_eq!(
            StatusCode::from_result(&d.enable_password_safe(USER)),
            StatusCode::Busy
        );
        reported += 25;
        d.report_fill_progress(reported).unwrap();
    }

    d.enable_password_safe(USER).unwrap();
}

#[test]
fn test_unencrypted_volume_modes() {
    let mut d = driver(DriverConfig::default());
    d.set_unencrypted_read_only(USER).unwrap();
    d.set_unencrypted_read_write(USER).unwrap();
    d.set_unencrypted_read_only_admin(ADMIN).unwrap();
    assert!(d.status().unencrypted_read_only);
    d.set_unencrypted_read_write_admin(ADMIN).unwrap();
    assert!(!d.status().unencrypted_read_only);
}

#[test]
fn test_clear_new_sd_card_notification() {
    let mut d = driver(DriverConfig::default());
    assert!(d.status().new_sd_card_found);
    d.clear_new_sd_card_warning(ADMIN).unwrap();
    assert!(!d.status().new_sd_card_found);
}
