//! Import command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use nimbus_store::{DocumentKey, Store};
use tracing::info;

/// Import a local-storage value exported from the browser app.
pub fn cmd_import(store: &Store, key: DocumentKey, file: &Path, quiet: bool) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    store
        .import_legacy(key, &json)
        .with_context(|| format!("Failed to import {} from {}", key, file.display()))?;

    info!("Imported {} from {}", key, file.display());
    if !quiet {
        println!("Imported {}", key);
    }
    Ok(())
}
