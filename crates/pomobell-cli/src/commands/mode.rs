use clap::Subcommand;
use pomobell_core::mode::MODE_KEY;
use pomobell_core::TimerMode;

use super::open_store;

#[derive(Subcommand)]
pub enum ModeAction {
    /// Print the mode the timer starts in
    Get,
    /// Choose the mode for the next `timer run`
    Set {
        /// pomodoro or stopwatch
        mode: TimerMode,
    },
}

pub fn run(action: ModeAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store()?;
    match action {
        ModeAction::Get => {
            let mode = store
                .get(MODE_KEY)?
                .and_then(|raw| raw.parse::<TimerMode>().ok())
                .unwrap_or_default();
            println!("{mode}");
        }
        ModeAction::Set { mode } => {
            store.set(MODE_KEY, mode.as_str())?;
            println!("mode set to {mode}");
        }
    }
    Ok(())
}
