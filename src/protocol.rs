//! Messages exchanged between the session controller and its observers
//!
//! Two shapes only: intents that may carry an optional reply, and
//! broadcasts that expect none. A missing reply is never a failure.

use serde::{Deserialize, Serialize};

use crate::{
    services::TabId,
    state::{Settings, SettingsInput, TimerState},
};

/// Observer (or host) to controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Start,
    Pause,
    Reset,
    #[serde(rename_all = "camelCase")]
    BreakEnded {
        #[serde(default)]
        manual_resume: bool,
    },
    SaveSettings {
        settings: SettingsInput,
    },
    /// Run completion logic if the deadline has passed. Sent by wakes and by
    /// observers that notice an expired timer.
    CheckExpiry,
    #[serde(rename_all = "camelCase")]
    TabActivated {
        tab_id: TabId,
    },
    #[serde(rename_all = "camelCase")]
    TabNavigated {
        tab_id: TabId,
        url: String,
    },
    GetState,
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::Start => "start",
            Intent::Pause => "pause",
            Intent::Reset => "reset",
            Intent::BreakEnded { .. } => "break-ended",
            Intent::SaveSettings { .. } => "save-settings",
            Intent::CheckExpiry => "check-expiry",
            Intent::TabActivated { .. } => "tab-activated",
            Intent::TabNavigated { .. } => "tab-navigated",
            Intent::GetState => "get-state",
        }
    }
}

/// Optional answer to an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reply {
    State { state: TimerState },
    Settings { settings: Settings },
    /// Validation failure the user should see.
    Rejected { reason: String },
    /// Internal failure, already logged.
    Failed { error: String },
}

/// Controller to every attached observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Broadcast {
    StateChanged { state: TimerState },
    SettingsChanged { settings: Settings },
}

/// Tab changes the host bridge must apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TabCommand {
    #[serde(rename_all = "camelCase")]
    Navigate { tab_id: TabId, url: String },
    #[serde(rename_all = "camelCase")]
    Create { tab_id: TabId, url: String, active: bool },
    #[serde(rename_all = "camelCase")]
    Close { tab_id: TabId },
}
