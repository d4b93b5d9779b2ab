//! Configuration file I/O operations
//!
//! All loads and saves validate the configuration.

use super::paths::get_config_path;
use super::schema::RequesterConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Load configuration from the default location
///
/// Returns a default config if the file doesn't exist.
pub fn load_config() -> Result<RequesterConfig> {
    load_config_from(&get_config_path()?)
}

/// Load configuration from `path`
pub fn load_config_from(path: &Path) -> Result<RequesterConfig> {
    if !path.exists() {
        return Ok(RequesterConfig::default());
    }

    let content =
        fs::read_to_string(path).context(format!("Failed to read config: {}", path.display()))?;

    let config: RequesterConfig =
        toml::from_str(&content).context(format!("Failed to parse config: {}", path.display()))?;

    if let Err(errors) = config.validate() {
        anyhow::bail!(
            "Config validation failed in {}:\n  {}",
            path.display(),
            errors.join("\n  ")
        );
    }

    Ok(config)
}

/// Save configuration to `path`
///
/// Creates parent directories if needed.
pub fn save_config_to(path: &Path, config: &RequesterConfig) -> Result<()> {
    if let Err(errors) = config.validate() {
        anyhow::bail!("cannot save invalid config:\n  {}", errors.join("\n  "));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context(format!(
            "Failed to create config directory: {}",
            parent.display()
        ))?;
    }

    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(path, content).context(format!("Failed to write config: {}", path.display()))?;

    Ok(())
}
