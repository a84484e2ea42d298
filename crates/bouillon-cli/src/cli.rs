use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// CLI surface definition. Store commands load the data file, act, and write it back.
#[derive(Parser, Debug)]
#[command(
    name = "bouillon",
    about = "Persistent dot-path key-value store backed by a single file",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Base name of the data file (`<name>.txt`).
    #[arg(long, global = true)]
    pub name: Option<String>,
    /// Directory holding the data file.
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    #[command(flatten)]
    Store(StoreCommand),
    /// Print a fresh random 32-character encryption key.
    Keygen,
    /// Print version and exit.
    Version,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum StoreCommand {
    /// Print the value at a dot path, e.g. `favorites.book`.
    Get { path: String },
    /// Store a value at a dot path. The value is parsed as JSON, or kept as a plain string.
    Set { path: String, value: String },
    /// Remove the value at a dot path.
    Unset { path: String },
    /// Remove every key.
    Clear,
    /// Pretty-print the whole store.
    Show,
}

impl StoreCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Get { .. } => "get",
            Self::Set { .. } => "set",
            Self::Unset { .. } => "unset",
            Self::Clear => "clear",
            Self::Show => "show",
        }
    }

    /// Target path, if any. Values are never exposed here so this is safe to log.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Get { path } | Self::Set { path, .. } | Self::Unset { path } => Some(path),
            Self::Clear | Self::Show => None,
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_get_with_dotted_path() {
        let cli = Cli::try_parse_from(["bouillon", "get", "favorites.book"])
            .expect("parse should succeed");
        assert_eq!(
            cli.command,
            Command::Store(StoreCommand::Get {
                path: "favorites.book".into()
            })
        );
    }

    #[test]
    fn parses_set_with_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "bouillon",
            "set",
            "favorites.game",
            "Chess",
            "--name",
            "settings",
            "--dir",
            "/tmp/data",
        ])
        .expect("parse should succeed");
        assert_eq!(
            cli.command,
            Command::Store(StoreCommand::Set {
                path: "favorites.game".into(),
                value: "Chess".into()
            })
        );
        assert_eq!(cli.name.as_deref(), Some("settings"));
        assert_eq!(cli.dir, Some(PathBuf::from("/tmp/data")));
    }

    #[test]
    fn parses_keygen_and_config_init() {
        let cli = Cli::try_parse_from(["bouillon", "keygen"]).expect("parse should succeed");
        assert_eq!(cli.command, Command::Keygen);

        let cli =
            Cli::try_parse_from(["bouillon", "config", "init"]).expect("parse should succeed");
        assert_eq!(cli.command, Command::Config(ConfigCommand::Init));
    }

    #[test]
    fn loggable_fields_leave_out_values() {
        let cmd = StoreCommand::Set {
            path: "secrets.pin".into(),
            value: "1234".into(),
        };
        assert_eq!(cmd.name(), "set");
        assert_eq!(cmd.path(), Some("secrets.pin"));
        assert_eq!(StoreCommand::Show.path(), None);
        assert_eq!(StoreCommand::Clear.name(), "clear");
    }

    #[test]
    fn requires_a_subcommand() {
        assert!(Cli::try_parse_from(["bouillon"]).is_err());
    }
}
