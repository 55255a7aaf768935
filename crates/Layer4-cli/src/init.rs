//! `codepad config --init`
//!
//! Writes a default `config.json` into the project's `.codepad/` directory,
//! or into the user config directory with `--global`.

use codepad_foundation::{CodepadConfig, JsonStore, CODEPAD_CONFIG_FILE};
use std::path::PathBuf;

/// Initialize Codepad configuration
pub fn init_config(global: bool, force: bool) -> anyhow::Result<()> {
    let store = if global {
        JsonStore::global()?
    } else {
        JsonStore::current_project()?
    };

    match init_in(&store, force)? {
        Some(path) => {
            println!("✓ Created {}", path.display());
            println!("\nEdit it to point at your task service or pick a Python interpreter.");
        }
        None => {
            println!(
                "✓ Codepad config already exists at {}",
                store.file_path(CODEPAD_CONFIG_FILE).display()
            );
            println!("  Use --force to overwrite.");
        }
    }
    Ok(())
}

/// Returns the written path, or `None` if a config exists and `force` is off
fn init_in(store: &JsonStore, force: bool) -> anyhow::Result<Option<PathBuf>> {
    if store.exists(CODEPAD_CONFIG_FILE) && !force {
        return Ok(None);
    }

    CodepadConfig::new().save_to(store)?;
    Ok(Some(store.file_path(CODEPAD_CONFIG_FILE)))
}
