mod cli;
mod commands;
mod config;
mod storage;

use bouillon_storage::codec::EncryptionKey;
use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Command, ConfigCommand};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = match &cli.config {
        Some(path) => config::load_from_path(path)?,
        None => config::load()?,
    };

    match cli.command {
        Command::Store(cmd) => {
            let options = storage::options_from_config(&config, cli.name, cli.dir)?;
            let output = commands::handle(cmd, options).await?;
            if !output.is_empty() {
                println!("{output}");
            }
        }
        Command::Keygen => println!("{}", EncryptionKey::generate()),
        Command::Version => print_version(),
        Command::Config(ConfigCommand::Init) => {
            let path = match cli.config {
                Some(path) => path,
                None => config::default_path()?,
            };
            let written = config::write_if_missing(&config, &path)?;
            println!("Config initialized at {}", written.display());
        }
    }

    Ok(())
}

fn init_tracing() {
    // Logs go to stderr so stdout stays clean for values; quiet unless asked.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("bouillon {}", env!("CARGO_PKG_VERSION"));
}
