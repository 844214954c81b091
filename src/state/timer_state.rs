//! Timer state record and the derived phase

use serde::{Deserialize, Serialize};

use super::Settings;

/// Which interval the timer is counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Work,
    Break,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Work => "work",
            Mode::Break => "break",
        }
    }
}

/// Short or long break, chosen from the session counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakKind {
    Short,
    Long,
}

impl BreakKind {
    /// Every fourth completed session earns a long break.
    pub fn for_sessions(sessions_completed: u32) -> Self {
        if sessions_completed > 0 && sessions_completed % 4 == 0 {
            BreakKind::Long
        } else {
            BreakKind::Short
        }
    }

    pub fn duration(&self, settings: &Settings) -> u64 {
        match self {
            BreakKind::Short => settings.short_break_duration,
            BreakKind::Long => settings.long_break_duration,
        }
    }
}

/// Canonical "what is the timer doing right now" record.
///
/// `time_left` is authoritative while idle, `timer_end_time` while running.
/// Remaining time for a running timer is always derived from the deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub mode: Mode,
    pub is_running: bool,
    pub time_left: u64,
    #[serde(default)]
    pub timer_end_time: i64,
    #[serde(default)]
    pub sessions_completed: u32,
    #[serde(default)]
    pub timestamp: i64,
}

impl TimerState {
    /// Fresh install: an idle work interval with the full duration.
    pub fn initial(settings: &Settings, now_ms: i64) -> Self {
        Self::idle(Mode::Work, settings.work_duration, 0, now_ms)
    }

    pub fn idle(mode: Mode, time_left: u64, sessions_completed: u32, now_ms: i64) -> Self {
        Self {
            mode,
            is_running: false,
            time_left,
            timer_end_time: 0,
            sessions_completed,
            timestamp: now_ms,
        }
    }

    pub fn running(mode: Mode, duration: u64, end_ms: i64, sessions_completed: u32, now_ms: i64) -> Self {
        Self {
            mode,
            is_running: true,
            time_left: duration,
            timer_end_time: end_ms,
            sessions_completed,
            timestamp: now_ms,
        }
    }

    pub fn is_break_running(&self) -> bool {
        self.mode == Mode::Break && self.is_running
    }

    /// Full length of the interval this record is in.
    pub fn full_duration(&self, settings: &Settings) -> u64 {
        match self.mode {
            Mode::Work => settings.work_duration,
            Mode::Break => BreakKind::for_sessions(self.sessions_completed).duration(settings),
        }
    }

    /// Compare everything but the diagnostic write timestamp.
    pub fn same_timer(&self, other: &TimerState) -> bool {
        self.mode == other.mode
            && self.is_running == other.is_running
            && self.time_left == other.time_left
            && self.timer_end_time == other.timer_end_time
            && self.sessions_completed == other.sessions_completed
    }
}

/// Coarse state-machine position derived from the record plus the pending
/// tab snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    WorkIdle,
    WorkRunning,
    BreakRunning,
    BreakIdle,
    BreakEndedAwaitingResume,
}

impl Phase {
    pub fn of(state: &TimerState, snapshot_pending: bool) -> Self {
        match (state.mode, state.is_running) {
            (Mode::Work, true) => Phase::WorkRunning,
            (Mode::Break, true) => Phase::BreakRunning,
            (Mode::Break, false) => Phase::BreakIdle,
            (Mode::Work, false) if snapshot_pending => Phase::BreakEndedAwaitingResume,
            (Mode::Work, false) => Phase::WorkIdle,
        }
    }
}
