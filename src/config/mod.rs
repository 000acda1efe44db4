mod company;
pub mod store;

pub use company::{Company, Config, LedgerSettings};

use crate::error::{LedgerError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use store::Store;

/// Get the config directory path (~/.duebook/)
pub fn config_dir() -> Result<PathBuf> {
    // First try XDG-style directories
    if let Some(proj_dirs) = ProjectDirs::from("", "", "duebook") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    // Fallback to ~/.duebook/
    let home = dirs_home().ok_or_else(|| {
        LedgerError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".duebook"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Load the main config.toml
pub fn load_config(config_dir: &Path) -> Result<Config> {
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Err(LedgerError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| LedgerError::ConfigParse { path, source: e })
}

/// Load ledger.toml (empty default if missing)
pub fn load_store(config_dir: &Path) -> Result<Store> {
    let path = config_dir.join("ledger.toml");
    if !path.exists() {
        return Ok(Store::default());
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| LedgerError::ConfigParse { path, source: e })
}

/// Persist the store with an optimistic revision check: if another
/// process committed since this store was loaded, nothing is written.
pub fn commit_store(config_dir: &Path, store: &mut Store) -> Result<()> {
    let path = config_dir.join("ledger.toml");

    let on_disk = if path.exists() {
        load_store(config_dir)?.revision
    } else {
        0
    };
    if on_disk != store.revision {
        return Err(LedgerError::ConcurrentUpdate {
            expected: store.revision,
            found: on_disk,
        });
    }

    store.revision += 1;
    let content = toml::to_string_pretty(store).map_err(|e| {
        LedgerError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e.to_string(),
        ))
    })?;
    fs::write(path, content)?;
    Ok(())
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[company]
name = "Your Company Name"
# address = "123 Market Street, Riyadh"  # optional
# phone = "+966-555-123456"              # optional
# email = "accounts@yourcompany.com"     # optional
# tax_id = "300000000000003"             # optional

[ledger]
number_format = "{prefix}-{year}-{seq:04}"  # e.g., INV-2026-0001
currency = "SAR"
currency_symbol = "SAR "
# report_currency = "USD"  # also show outstanding dues converted to this currency
"#;
