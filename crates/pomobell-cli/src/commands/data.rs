use std::sync::Arc;

use clap::Subcommand;
use pomobell_core::runtime;
use pomobell_core::{Services, SystemClock};

use super::open_store;

#[derive(Subcommand)]
pub enum DataAction {
    /// Delete session history and the work-interval counter
    Clear {
        /// Required; the wipe can't be undone
        #[arg(long)]
        yes: bool,
    },
    /// Print the database location
    Path,
}

pub fn run(action: DataAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        DataAction::Clear { yes } => {
            if !yes {
                return Err("refusing to clear data without --yes".into());
            }
            let store = open_store()?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(async move {
                let (handle, task) = runtime::spawn(store, Arc::new(SystemClock), Services::silent())?;
                handle.clear_all_data().await?;
                handle.shutdown();
                task.await?;
                Ok::<_, Box<dyn std::error::Error>>(())
            })?;
            println!("session data cleared");
        }
        DataAction::Path => {
            let path = pomobell_core::storage::data_dir()?.join(pomobell_core::storage::database::DB_FILE);
            println!("{}", path.display());
        }
    }
    Ok(())
}
