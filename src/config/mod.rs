pub mod station;

pub use station::{Config, DebugLogRotation, Provider, SearchConfig, ServerConfig, Station};

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration file path
///
/// `ROAMER_CONFIG` overrides the default `<config_dir>/roamer/config.toml`.
pub fn config_path() -> Result<PathBuf> {
    if let Some(custom) = std::env::var_os("ROAMER_CONFIG") {
        return Ok(PathBuf::from(custom));
    }

    let config_dir = dirs::config_dir()
        .context("Failed to get config directory")?
        .join("roamer");

    Ok(config_dir.join("config.toml"))
}

/// Load configuration from file, or create default if not exists.
///
/// Credentials missing from the file are filled from the environment.
pub fn load_or_create_config() -> Result<Config> {
    let path = config_path()?;
    let mut config = load_or_create_at(&path)?;
    config.apply_env_overrides();
    Ok(config)
}

/// Same as [`load_or_create_config`] for an explicit path, without env overrides.
pub fn load_or_create_at(path: &Path) -> Result<Config> {
    if path.exists() {
        return load_from(path);
    }

    let config = Config::default();
    save_config_at(path, &config)?;

    println!("Created default config at: {}", path.display());
    println!("Set OPENAI_API_KEY and BRIGHTDATA_API_KEY, or edit this file to add your API credentials.");

    Ok(config)
}

pub fn load_from(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}

/// Write `config` to `path`, creating parent directories.
pub fn save_config_at(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, content).context("Failed to write config file")?;
    Ok(())
}
