//! Token Storage - command-line transport for an emulated storage token.
//!
//! Each invocation is a power cycle: the image is opened locked, the command
//! runs against the driver, and durable state is written back.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use token_storage::device::parse_status;
use token_storage::{DriverConfig, StatusCode, StorageDriver, TokenImage};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "token-storage")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Emulated USB storage token: hidden volumes and password safe",
    long_about = "Drives the encrypted volume, hidden volume and password safe state machine of a storage token kept in a sealed image file."
)]
struct Cli {
    /// Driver configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Read passwords as hex-encoded bytes
    #[arg(long, global = true)]
    hex: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a factory-state token image
    Init {
        /// Token image file
        image: PathBuf,
    },

    /// Show device status
    Status {
        /// Token image file
        image: PathBuf,

        /// Print the raw status blob instead of parsed fields
        #[arg(long)]
        raw: bool,
    },

    /// Write a password safe slot (password is prompted)
    PwsWrite {
        /// Token image file
        image: PathBuf,

        /// Slot index (0-15)
        #[arg(long)]
        slot: usize,

        /// Slot name (up to 11 bytes)
        #[arg(long)]
        name: String,

        /// Login (up to 32 bytes)
        #[arg(long)]
        login: String,
    },

    /// Read a password safe slot
    PwsRead {
        /// Token image file
        image: PathBuf,

        /// Slot index (0-15)
        #[arg(long)]
        slot: usize,
    },

    /// Erase a password safe slot
    PwsErase {
        /// Token image file
        image: PathBuf,

        /// Slot index (0-15)
        #[arg(long)]
        slot: usize,
    },

    /// Define a hidden volume (hidden volume password is prompted)
    HiddenCreate {
        /// Token image file
        image: PathBuf,

        /// Hidden volume slot (0-3)
        #[arg(long)]
        slot: usize,

        /// Start of the range, percent of the encrypted volume
        #[arg(long)]
        start: u8,

        /// End of the range (exclusive), percent of the encrypted volume
        #[arg(long)]
        end: u8,
    },

    /// Check which hidden volume a password unlocks
    HiddenUnlock {
        /// Token image file
        image: PathBuf,
    },

    /// List defined hidden volumes and overlapping ranges
    HiddenList {
        /// Token image file
        image: PathBuf,
    },

    /// Switch the unencrypted volume between read-only and read-write
    UnencryptedMode {
        /// Token image file
        image: PathBuf,

        /// Make the volume read-only (default: read-write)
        #[arg(long)]
        read_only: bool,

        /// Authorize with the admin password instead of the user password
        #[arg(long)]
        admin: bool,
    },

    /// Clear the new SD card warning (admin)
    ClearSdWarning {
        /// Token image file
        image: PathBuf,
    },

    /// Change the user or admin password
    Passwd {
        /// Token image file
        image: PathBuf,

        /// Change the admin password
        #[arg(long)]
        admin: bool,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => DriverConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DriverConfig::default(),
    };
    let hex = cli.hex;

    match cli.command {
        Commands::Init { image } => cmd_init(&image, config),
        Commands::Status { image, raw } => cmd_status(&image, config, hex, raw),
        Commands::PwsWrite {
            image,
            slot,
            name,
            login,
        } => cmd_pws_write(&image, config, hex, slot, &name, &login),
        Commands::PwsRead { image, slot } => cmd_pws_read(&image, config, hex, slot),
        Commands::PwsErase { image, slot } => cmd_pws_erase(&image, config, hex, slot),
        Commands::HiddenCreate {
            image,
            slot,
            start,
            end,
        } => cmd_hidden_create(&image, config, hex, slot, start, end),
        Commands::HiddenUnlock { image } => cmd_hidden_unlock(&image, config, hex),
        Commands::HiddenList { image } => cmd_hidden_list(&image, config, hex),
        Commands::UnencryptedMode {
            image,
            read_only,
            admin,
        } => cmd_unencrypted_mode(&image, config, hex, read_only, admin),
        Commands::ClearSdWarning { image } => cmd_clear_sd_warning(&image, config, hex),
        Commands::Passwd { image, admin } => cmd_passwd(&image, config, hex, admin),
    }
}

fn prompt_password(prompt: &str, hex: bool) -> anyhow::Result<Vec<u8>> {
    let entered = rpassword::prompt_password(prompt).context("reading password")?;
    if hex {
        hex::decode(entered.trim()).context("password is not valid hex")
    } else {
        Ok(entered.into_bytes())
    }
}

/// Open the image with the user password; returns the driver and the password.
fn open(image: &Path, config: DriverConfig, hex: bool) -> anyhow::Result<(StorageDriver, Vec<u8>)> {
    let user = prompt_password("User password: ", hex)?;
    let driver = TokenImage::open(image, &user, config)
        .with_context(|| format!("opening {}", image.display()))?;
    Ok((driver, user))
}

/// Report the status code of a driver operation and fail on error.
fn report<T>(result: token_storage::Result<T>) -> anyhow::Result<T> {
    println!("{}", StatusCode::from_result(&result));
    Ok(result?)
}

fn save(image: &Path, driver: &StorageDriver, user: &[u8]) -> anyhow::Result<()> {
    TokenImage::save(image, driver, user).with_context(|| format!("writing {}", image.display()))
}

fn cmd_init(image: &Path, config: DriverConfig) -> anyhow::Result<()> {
    TokenImage::create(image, config)?;
    println!("Token image created: {}", image.display());
    println!("  Factory user password:  123456");
    println!("  Factory admin password: 12345678");
    Ok(())
}

fn cmd_status(image: &Path, config: DriverConfig, hex: bool, raw: bool) -> anyhow::Result<()> {
    let (driver, _) = open(image, config, hex)?;
    let blob = driver.status().render();

    if raw {
        print!("{}", blob);
        return Ok(());
    }
    for (key, value) in parse_status(&blob) {
        if !value.is_empty() {
            println!("{:<24}{}", key, value);
        }
    }
    Ok(())
}

fn cmd_pws_write(
    image: &Path,
    config: DriverConfig,
    hex: bool,
    slot: usize,
    name: &str,
    login: &str,
) -> anyhow::Result<()> {
    let (mut driver, user) = open(image, config, hex)?;
    let password = prompt_password("Slot password: ", hex)?;

    report(driver.enable_password_safe(&user))?;
    report(driver.write_password_safe_slot(slot, name.as_bytes(), login.as_bytes(), &password))?;
    save(image, &driver, &user)
}

fn cmd_pws_read(image: &Path, config: DriverConfig, hex: bool, slot: usize) -> anyhow::Result<()> {
    let (mut driver, user) = open(image, config, hex)?;
    report(driver.enable_password_safe(&user))?;
    let entry = report(driver.password_safe_slot(slot))?;

    println!("Name:     {}", String::from_utf8_lossy(entry.name.as_bytes()));
    println!("Login:    {}", String::from_utf8_lossy(entry.login.as_bytes()));
    println!("Password: {}", String::from_utf8_lossy(entry.password.as_bytes()));
    Ok(())
}

fn cmd_pws_erase(image: &Path, config: DriverConfig, hex: bool, slot: usize) -> anyhow::Result<()> {
    let (mut driver, user) = open(image, config, hex)?;
    report(driver.enable_password_safe(&user))?;
    report(driver.erase_password_safe_slot(slot))?;
    save(image, &driver, &user)
}

fn cmd_hidden_create(
    image: &Path,
    config: DriverConfig,
    hex: bool,
    slot: usize,
    start: u8,
    end: u8,
) -> anyhow::Result<()> {
    let (mut driver, user) = open(image, config, hex)?;
    let hidden = prompt_password("Hidden volume password: ", hex)?;

    report(driver.unlock_encrypted_volume(&user))?;
    report(driver.create_hidden_volume(slot, start, end, &hidden))?;
    save(image, &driver, &user)
}

fn cmd_hidden_unlock(image: &Path, config: DriverConfig, hex: bool) -> anyhow::Result<()> {
    let (mut driver, user) = open(image, config, hex)?;
    let hidden = prompt_password("Hidden volume password: ", hex)?;

    report(driver.unlock_encrypted_volume(&user))?;
    let slot = report(driver.unlock_hidden_volume(&hidden))?;
    let range = driver
        .hidden_volumes()
        .get(slot)
        .map(|s| s.range.to_string())
        .unwrap_or_default();
    println!("Hidden volume {} unlocked {}", slot, range);
    save(image, &driver, &user)
}

fn cmd_hidden_list(image: &Path, config: DriverConfig, hex: bool) -> anyhow::Result<()> {
    let (mut driver, user) = open(image, config, hex)?;
    report(driver.unlock_encrypted_volume(&user))?;

    let table = driver.hidden_volumes();
    if table.defined_count() == 0 {
        println!("No hidden volumes defined");
    }
    for (index, slot) in table.iter() {
        println!(
            "Slot {}: {} ({}% of the encrypted volume)",
            index,
            slot.range,
            slot.range.width()
        );
    }
    for (a, b) in table.overlapping_pairs() {
        println!("Warning: slots {} and {} overlap", a, b);
    }
    save(image, &driver, &user)
}

fn cmd_unencrypted_mode(
    image: &Path,
    config: DriverConfig,
    hex: bool,
    read_only: bool,
    admin: bool,
) -> anyhow::Result<()> {
    let (mut driver, user) = open(image, config, hex)?;

    let result = match (admin, read_only) {
        (false, true) => driver.set_unencrypted_read_only(&user),
        (false, false) => driver.set_unencrypted_read_write(&user),
        (true, ro) => {
            let admin_pw = prompt_password("Admin password: ", hex)?;
            if ro {
                driver.set_unencrypted_read_only_admin(&admin_pw)
            } else {
                driver.set_unencrypted_read_write_admin(&admin_pw)
            }
        }
    };
    // Retry counters changed either way.
    save(image, &driver, &user)?;
    report(result)
}

fn cmd_clear_sd_warning(image: &Path, config: DriverConfig, hex: bool) -> anyhow::Result<()> {
    let (mut driver, user) = open(image, config, hex)?;
    let admin_pw = prompt_password("Admin password: ", hex)?;

    let result = driver.clear_new_sd_card_warning(&admin_pw);
    save(image, &driver, &user)?;
    report(result)
}

fn cmd_passwd(image: &Path, config: DriverConfig, hex: bool, admin: bool) -> anyhow::Result<()> {
    let (mut driver, user) = open(image, config, hex)?;

    let old = if admin {
        prompt_password("Current admin password: ", hex)?
    } else {
        user.clone()
    };
    let new = prompt_password("New password: ", hex)?;
    let confirm = prompt_password("Confirm new password: ", hex)?;
    if new != confirm {
        bail!("Passwords do not match");
    }

    if admin {
        let result = driver.change_admin_password(&old, &new);
        save(image, &driver, &user)?;
        report(result)
    } else {
        report(driver.change_user_password(&old, &new))?;
        save(image, &driver, &new)
    }
}
