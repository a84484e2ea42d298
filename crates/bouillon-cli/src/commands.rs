use bouillon_core::Value;
use bouillon_storage::{Bouillon, BouillonError, Options};
use color_eyre::{eyre::bail, Result};
use tracing::instrument;

use crate::cli::StoreCommand;

/// Execute a store subcommand and return the text to print.
///
/// Mutating commands write the file before returning.
#[instrument(skip_all, fields(cmd = cmd.name(), path = cmd.path()))]
pub async fn handle(cmd: StoreCommand, options: Options) -> Result<String> {
    let mut bouillon = Bouillon::new(options)?;
    match bouillon.read().await.map(|_| ()) {
        Ok(()) | Err(BouillonError::NotFound { .. }) => {}
        Err(err) => return Err(err.into()),
    }

    let output = match cmd {
        StoreCommand::Get { path } => match bouillon.get(&path) {
            Some(value) => render(value)?,
            None => bail!("no value at `{path}`"),
        },
        StoreCommand::Show => render(&Value::Object(bouillon.store().as_map().clone()))?,
        StoreCommand::Set { path, value } => {
            bouillon.set(&path, parse_value(&value))?;
            bouillon.write().await?;
            format!("Saved {path}")
        }
        StoreCommand::Unset { path } => {
            if bouillon.remove(&path).is_none() {
                bail!("no value at `{path}`");
            }
            bouillon.write().await?;
            format!("Removed {path}")
        }
        StoreCommand::Clear => {
            bouillon.clear();
            bouillon.write().await?;
            "Store cleared".to_string()
        }
    };

    Ok(output)
}

/// JSON literals are stored as typed values; anything else as a plain string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn render(value: &Value) -> Result<String> {
    Ok(match value {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other)?,
    })
}
