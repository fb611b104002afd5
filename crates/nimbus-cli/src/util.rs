//! Utility functions for CLI operations.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nimbus_service::Config;
use nimbus_service::config::default_config_path;
use nimbus_store::Store;

/// Config file to use: the explicit one, or the shared default.
pub fn config_path(explicit: Option<&PathBuf>) -> PathBuf {
    explicit.cloned().unwrap_or_else(default_config_path)
}

/// Load the configuration.
///
/// An explicit path must exist; the default path falls back to defaults.
pub fn load_config(explicit: Option<&PathBuf>) -> Result<Config> {
    let config = match explicit {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    config.validate()?;
    Ok(config)
}

/// Open the database, preferring `database` over the configured path.
pub fn open_store(database: Option<&PathBuf>, config: &Config) -> Result<Store> {
    let path: &Path = database.map_or(config.storage.path.as_path(), |p| p.as_path());
    Store::open(path).with_context(|| format!("Failed to open database {}", path.display()))
}

/// Write output to file or stdout.
pub fn write_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        None => {
            print!("{}", content);
            io::stdout().flush()?;
        }
    }
    Ok(())
}
