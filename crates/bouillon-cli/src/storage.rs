use std::path::PathBuf;

use bouillon_storage::{options::DEFAULT_NAME, Options};
use color_eyre::Result;
use dirs::data_dir;
use tracing::debug;

use crate::config::Config;

/// Environment variable that overrides the configured encryption key.
pub const KEY_ENV: &str = "BOUILLON_ENCRYPTION_KEY";

/// Resolve the default data directory for Bouillon.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("bouillon"))
}

/// Build store options from CLI flags, the environment, and config, in that order.
pub fn options_from_config(
    config: &Config,
    name: Option<String>,
    dir: Option<PathBuf>,
) -> Result<Options> {
    let directory = match dir.or_else(|| config.directory.clone()) {
        Some(directory) => directory,
        None => default_data_dir()?,
    };
    Ok(resolve(config, name, directory, std::env::var(KEY_ENV).ok()))
}

fn resolve(
    config: &Config,
    name: Option<String>,
    directory: PathBuf,
    env_key: Option<String>,
) -> Options {
    let name = name
        .or_else(|| config.name.clone())
        .unwrap_or_else(|| DEFAULT_NAME.to_string());
    let key = env_key.or_else(|| config.encryption_key.clone());
    debug!(?directory, %name, encrypted = key.is_some(), "resolved store options");

    let options = Options::new(name)
        .with_directory(directory)
        .with_autosave(config.autosave.unwrap_or(false));
    match key {
        Some(key) => options.with_encryption_key(key),
        None => options,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let config = Config {
            name: Some("from-config".into()),
            directory: Some(PathBuf::from("/config/dir")),
            encryption_key: None,
            autosave: None,
        };
        let options = resolve(
            &config,
            Some("from-flag".into()),
            PathBuf::from("/flag/dir"),
            None,
        );
        assert_eq!(options.name, "from-flag");
        assert_eq!(options.directory, Some(PathBuf::from("/flag/dir")));
        assert_eq!(options.encryption_key, None);
        assert!(!options.autosave);
    }

    #[test]
    fn falls_back_to_config_then_default_name() {
        let config = Config {
            name: Some("settings".into()),
            encryption_key: Some("c".repeat(32)),
            autosave: Some(true),
            ..Config::default()
        };
        let options = resolve(&config, None, PathBuf::from("/data"), None);
        assert_eq!(options.file_name(), "settings.txt");
        assert_eq!(options.encryption_key, Some("c".repeat(32)));
        assert!(options.autosave);

        let options = resolve(&Config::default(), None, PathBuf::from("/data"), None);
        assert_eq!(options.file_name(), "bouillon.txt");
    }

    #[test]
    fn env_key_takes_precedence_over_config_key() {
        let config = Config {
            encryption_key: Some("c".repeat(32)),
            ..Config::default()
        };
        let options = resolve(&config, None, PathBuf::from("/data"), Some("e".repeat(32)));
        assert_eq!(options.encryption_key, Some("e".repeat(32)));
    }

    #[test]
    fn explicit_directory_skips_data_dir_lookup() {
        let config = Config {
            directory: Some(PathBuf::from("/config/dir")),
            ..Config::default()
        };
        let options = options_from_config(&config, None, None).expect("options");
        assert_eq!(options.directory, Some(PathBuf::from("/config/dir")));
    }
}
