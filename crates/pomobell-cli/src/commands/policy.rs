//! Configuration import/export CLI commands.
//!
//! Exported bundles are versioned JSON. Import is strict: a bundle with a
//! missing or out-of-range setting is rejected as a whole.

use std::fs;
use std::path::PathBuf;

use clap::Subcommand;
use pomobell_core::policy::{PolicyBundle, POLICY_VERSION};
use pomobell_core::storage::ConfigStore;

use super::open_store;

#[derive(Subcommand)]
pub enum PolicyAction {
    /// Export current configuration to a JSON file
    Export {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import configuration from a JSON file
    Import {
        /// Input file path
        file: PathBuf,
        /// Validate without applying changes
        #[arg(long)]
        dry_run: bool,
    },
    /// Show current bundle format version
    Version,
}

pub fn run(action: PolicyAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PolicyAction::Export { output } => export(output),
        PolicyAction::Import { file, dry_run } => import(file, dry_run),
        PolicyAction::Version => {
            println!("Policy format version: {POLICY_VERSION}");
            Ok(())
        }
    }
}

fn export(output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigStore::load(open_store()?)?;
    let json = config.export().to_json()?;
    match output {
        Some(path) => {
            fs::write(&path, json)?;
            eprintln!("Policy exported to: {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn import(file: PathBuf, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let json = fs::read_to_string(&file)?;
    if dry_run {
        let bundle = PolicyBundle::from_json(&json)?;
        println!("{}", serde_json::to_string_pretty(&bundle.config)?);
        eprintln!("Dry run: bundle is valid, nothing applied");
        return Ok(());
    }
    let config = ConfigStore::load(open_store()?)?;
    let applied = config.import(&json)?;
    println!("{}", serde_json::to_string_pretty(&applied)?);
    eprintln!("Policy imported from: {}", file.display());
    Ok(())
}
