//! What an observer shows, derived from a timer record and the clock

use serde::{Deserialize, Serialize};

use crate::state::{derive_remaining, BreakKind, Mode, Phase, TimerState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    pub mode: Mode,
    pub phase: Phase,
    pub is_running: bool,
    pub time_left: u64,
    pub sessions_completed: u32,
    pub break_kind: Option<BreakKind>,
    /// `MM:SS`
    pub clock: String,
    /// Toolbar badge: whole minutes left, empty while idle.
    pub badge: String,
}

impl TimerView {
    pub fn from_state(state: &TimerState, snapshot_pending: bool, now_ms: i64) -> Self {
        let time_left = derive_remaining(state, now_ms);
        Self {
            mode: state.mode,
            phase: Phase::of(state, snapshot_pending),
            is_running: state.is_running,
            time_left,
            sessions_completed: state.sessions_completed,
            break_kind: (state.mode == Mode::Break)
                .then(|| BreakKind::for_sessions(state.sessions_completed)),
            clock: format_clock(time_left),
            badge: badge_text(state.is_running, time_left),
        }
    }
}

pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

pub fn badge_text(is_running: bool, secs: u64) -> String {
    if !is_running || secs == 0 {
        return String::new();
    }
    let minutes = secs.div_ceil(60);
    if minutes > 60 {
        "60+".to_string()
    } else {
        minutes.to_string()
    }
}
