//! Terminal stand-ins for the menu-bar collaborators.

use std::io::Write;
use std::sync::{Arc, Mutex};

use pomobell_core::services::ActionHandler;
use pomobell_core::{
    AudioPlayer, IconKind, NotificationAction, NotificationCategory, Notifier, Services,
    StatusDisplay,
};

/// Prints notifications and remembers the action handler so typed commands
/// can trigger notification actions.
#[derive(Default)]
pub struct TerminalNotifier {
    handler: Mutex<Option<ActionHandler>>,
}

impl TerminalNotifier {
    /// Deliver `action` as if it was clicked on a notification.
    pub fn trigger(&self, action: NotificationAction) -> bool {
        let guard = self.handler.lock().unwrap_or_else(|p| p.into_inner());
        match guard.as_ref() {
            Some(handler) => {
                handler(action);
                true
            }
            None => false,
        }
    }
}

impl Notifier for TerminalNotifier {
    fn send(&self, title: &str, body: &str, category: NotificationCategory) {
        let hint = match category {
            NotificationCategory::RestStarted => "  (k to skip)",
            NotificationCategory::RestFinished => "",
        };
        println!("\r\x07{title}: {body}{hint}");
    }

    fn register_action_handler(&self, handler: ActionHandler) {
        *self.handler.lock().unwrap_or_else(|p| p.into_inner()) = Some(handler);
    }
}

pub struct TerminalAudio;

impl AudioPlayer for TerminalAudio {
    fn play_windup(&self) {
        tracing::debug!("windup");
    }

    fn play_ding(&self) {
        print!("\x07");
        let _ = std::io::stdout().flush();
    }

    fn start_ticking(&self) {
        tracing::debug!("ticking started");
    }

    fn stop_ticking(&self) {
        tracing::debug!("ticking stopped");
    }
}

/// Redraws a single status line.
pub struct TerminalDisplay;

impl StatusDisplay for TerminalDisplay {
    fn set_title(&self, title: Option<&str>) {
        let mut out = std::io::stdout();
        match title {
            Some(text) => {
                let _ = write!(out, "\r{text:<10}");
            }
            None => {
                let _ = write!(out, "\r{:<10}\r", "");
            }
        }
        let _ = out.flush();
    }

    fn set_icon(&self, icon: IconKind) {
        tracing::debug!(?icon, "icon");
    }
}

pub fn services(notifier: Arc<TerminalNotifier>) -> Services {
    Services {
        notifier,
        audio: Arc::new(TerminalAudio),
        display: Arc::new(TerminalDisplay),
    }
}
