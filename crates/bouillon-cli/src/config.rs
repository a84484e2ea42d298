use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::Result;
use dirs::config_dir;
use serde::{Deserialize, Serialize};

/// Settings read from `config.toml`. Every field is optional; unset fields
/// fall through to command-line flags or built-in defaults.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Base name of the data file.
    pub name: Option<String>,
    /// Override for the data directory.
    pub directory: Option<PathBuf>,
    /// 32-character key; when set the data file is encrypted.
    pub encryption_key: Option<String>,
    /// Passed through to the store options.
    pub autosave: Option<bool>,
}

/// Read `config.toml` from the platform config directory.
pub fn load() -> Result<Config> {
    let path = default_path()?;
    load_from_path(path)
}

/// Read a config file. A file that is absent or blank yields an empty [`Config`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = toml::from_str(&contents)?;
    Ok(cfg)
}

/// `<config dir>/bouillon/config.toml`, e.g. `~/.config/bouillon/config.toml` on Linux.
pub fn default_path() -> Result<PathBuf> {
    let base = config_dir().ok_or_else(|| color_eyre::eyre::eyre!("no config dir available"))?;
    Ok(base.join("bouillon").join("config.toml"))
}

/// Seed a config file at `path` and return where it lives. A file that is
/// already there is kept as is.
pub fn write_if_missing(config: &Config, path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(path.to_path_buf())
}
