use clap::Subcommand;
use itdesk_core::config::{Config, MAX_ACTION_GATE_MINUTES, MAX_UPCOMING_DAYS};

use super::CliResult;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value by dotted key
    Get {
        /// e.g. "backend.url", "calendar.upcoming_days"
        key: String,
    },
    /// Change one value and write the file
    Set {
        key: String,
        value: String,
    },
    /// Print every key as `key = value`
    List {
        /// Print the whole config as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Overwrite the file with defaults
    Reset,
}

pub fn run(action: ConfigAction) -> CliResult {
    match action {
        ConfigAction::Get { key } => {
            let value = Config::load()?
                .get(&key)
                .ok_or_else(|| format!("unknown key: {key}"))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value).map_err(|e| with_hint(&key, e))?;
            config.save()?;
            tracing::debug!(%key, %value, "config updated");
            println!("{key} = {value}");
        }
        ConfigAction::List { json: true } => {
            println!("{}", serde_json::to_string_pretty(&Config::load()?)?);
        }
        ConfigAction::List { json: false } => {
            println!("# {}", Config::path()?.display());
            for (key, value) in Config::load()?.entries() {
                println!("{key} = {value}");
            }
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}

/// Append the accepted range for bounded numeric keys.
fn with_hint(key: &str, err: itdesk_core::ConfigError) -> String {
    match key {
        "calendar.upcoming_days" => format!("{err} (0 to {MAX_UPCOMING_DAYS} days)"),
        "session.action_gate_minutes" => format!("{err} (1 to {MAX_ACTION_GATE_MINUTES} minutes)"),
        _ => err.to_string(),
    }
}
