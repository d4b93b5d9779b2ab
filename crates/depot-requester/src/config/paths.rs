//! Directory path management for depot
//!
//! All default locations are centralized here.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Get the base depot config directory (~/.config/depot/)
pub fn get_depot_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Failed to get config directory")?
        .join("depot"))
}

/// Get the config file path (~/.config/depot/config.toml)
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_depot_dir()?.join("config.toml"))
}

/// Get the default store directory (~/.local/share/depot/store on Linux)
pub fn get_default_store_dir() -> Result<PathBuf> {
    Ok(dirs::data_local_dir()
        .context("Failed to get local data directory")?
        .join("depot")
        .join("store"))
}
