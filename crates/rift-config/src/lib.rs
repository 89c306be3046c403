mod types;

pub use types::*;

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Returns the config directory: `<user config dir>/rift-demos/`.
pub fn config_dir() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join("rift-demos");
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Returns the config file path: `<user config dir>/rift-demos/config.toml`.
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load config from disk. On first run the defaults are written out as a template.
pub fn load_config() -> Result<AppConfig> {
    load_or_create_config_at(&config_path()?)
}

/// Load an existing config file, or create it with defaults when missing.
///
/// An existing file is never rewritten, even when it fails to parse.
pub fn load_or_create_config_at(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        return load_config_from(path);
    }
    let config = AppConfig::default();
    save_config_to(&config, path)?;
    Ok(config)
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        info!(?path, "Loaded config");
        Ok(config)
    } else {
        info!(?path, "No config found, using defaults");
        Ok(AppConfig::default())
    }
}

pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<()> {
    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    info!(?path, "Saved config");
    Ok(())
}
