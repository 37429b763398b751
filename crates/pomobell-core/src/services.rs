//! Collaborator interfaces the controller pushes side effects into.
//!
//! None of these calls report failure back to the core: delivery is
//! fire-and-forget, and an implementation that can fail logs on its own.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationCategory {
    /// Offers the skip-rest action.
    RestStarted,
    RestFinished,
}

/// User actions delivered back from a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationAction {
    SkipRest,
}

pub type ActionHandler = Box<dyn Fn(NotificationAction) + Send + Sync>;

pub trait Notifier: Send + Sync {
    fn send(&self, title: &str, body: &str, category: NotificationCategory);

    /// Install the callback for notification actions, replacing any
    /// previous one. The handler may run on any thread.
    fn register_action_handler(&self, handler: ActionHandler);
}

pub trait AudioPlayer: Send + Sync {
    fn play_windup(&self);

    fn play_ding(&self);

    fn start_ticking(&self);

    fn stop_ticking(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconKind {
    Idle,
    Work,
    ShortRest,
    LongRest,
    Stopwatch,
}

/// Menu-bar style status item. Push only.
pub trait StatusDisplay: Send + Sync {
    fn set_title(&self, title: Option<&str>);

    fn set_icon(&self, icon: IconKind);
}

/// Does nothing. For headless runs and for tests that only care about state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Notifier for Silent {
    fn send(&self, _title: &str, _body: &str, _category: NotificationCategory) {}

    fn register_action_handler(&self, _handler: ActionHandler) {}
}

impl AudioPlayer for Silent {
    fn play_windup(&self) {}

    fn play_ding(&self) {}

    fn start_ticking(&self) {}

    fn stop_ticking(&self) {}
}

impl StatusDisplay for Silent {
    fn set_title(&self, _title: Option<&str>) {}

    fn set_icon(&self, _icon: IconKind) {}
}
