use clap::Subcommand;
use pomobell_core::storage::ConfigStore;

use super::open_store;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "work_minutes", "stop_after_break")
        key: String,
    },
    /// Set a config value. Numbers are clamped into range.
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigStore::load(open_store()?)?;
    match action {
        ConfigAction::Get { key } => match config.get().get(&key) {
            Some(value) => println!("{value}"),
            None => {
                eprintln!("unknown key: {key}");
                std::process::exit(1);
            }
        },
        ConfigAction::Set { key, value } => {
            let stored = config.set_value(&key, &value)?;
            let effective = stored.get(&key).unwrap_or_default();
            if effective != value.trim() {
                println!("ok ({key} = {effective})");
            } else {
                println!("ok");
            }
        }
        ConfigAction::List => {
            let json = serde_json::to_string_pretty(&config.get())?;
            println!("{json}");
        }
        ConfigAction::Reset => {
            config.reset()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
