//! Pure timer transitions
//!
//! Shared by the controller and by every observer's self-healing check.
//! Nothing here touches storage, tabs or wakes: each function maps a
//! record and "now" to the record that should be true.

use super::{BreakKind, Mode, Settings, TimerState};

/// Seconds left on `state` at `now_ms`, rounded up and never negative.
pub fn derive_remaining(state: &TimerState, now_ms: i64) -> u64 {
    if state.is_running {
        ceil_secs(state.timer_end_time.saturating_sub(now_ms))
    } else {
        state.time_left
    }
}

/// Milliseconds to whole seconds, rounding up and clamping at zero.
pub fn ceil_secs(delta_ms: i64) -> u64 {
    if delta_ms <= 0 {
        0
    } else {
        (delta_ms / 1000 + i64::from(delta_ms % 1000 != 0)) as u64
    }
}

/// `base_ms` plus `secs`, saturating instead of wrapping.
pub fn deadline_after(base_ms: i64, secs: u64) -> i64 {
    let delta_ms = i64::try_from(secs).unwrap_or(i64::MAX).saturating_mul(1000);
    base_ms.saturating_add(delta_ms)
}

/// Outcome of checking a record against the clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Timer is not running; nothing can expire.
    Idle,
    /// Still counting down.
    Pending { remaining: u64 },
    /// A work interval ran out; `next` is the running break.
    WorkCompleted { next: TimerState, kind: BreakKind },
    /// A break ran out; `next` is an idle work interval.
    BreakCompleted { next: TimerState },
}

/// Take at most one step. The new break is anchored at the old deadline so
/// a late check produces the same record an on-time one would have.
pub fn advance(state: &TimerState, settings: &Settings, now_ms: i64) -> Advance {
    if !state.is_running {
        return Advance::Idle;
    }
    if now_ms < state.timer_end_time {
        return Advance::Pending {
            remaining: derive_remaining(state, now_ms),
        };
    }

    match state.mode {
        Mode::Work => {
            let sessions = state.sessions_completed.saturating_add(1);
            let kind = BreakKind::for_sessions(sessions);
            let duration = kind.duration(settings);
            let end = deadline_after(state.timer_end_time, duration);
            Advance::WorkCompleted {
                next: TimerState::running(Mode::Break, duration, end, sessions, now_ms),
                kind,
            }
        }
        Mode::Break => Advance::BreakCompleted {
            next: TimerState::idle(
                Mode::Work,
                settings.work_duration,
                state.sessions_completed,
                now_ms,
            ),
        },
    }
}

/// Start counting from the frozen `time_left`. `None` if already running.
pub fn start(state: &TimerState, now_ms: i64) -> Option<TimerState> {
    if state.is_running {
        return None;
    }
    Some(TimerState::running(
        state.mode,
        state.time_left,
        deadline_after(now_ms, state.time_left),
        state.sessions_completed,
        now_ms,
    ))
}

/// Freeze the remaining time. `None` if already idle.
pub fn pause(state: &TimerState, now_ms: i64) -> Option<TimerState> {
    if !state.is_running {
        return None;
    }
    Some(TimerState::idle(
        state.mode,
        derive_remaining(state, now_ms),
        state.sessions_completed,
        now_ms,
    ))
}

/// Back to the full duration of the current mode, stopped.
pub fn reset(state: &TimerState, settings: &Settings, now_ms: i64) -> TimerState {
    TimerState::idle(
        state.mode,
        state.full_duration(settings),
        state.sessions_completed,
        now_ms,
    )
}

/// Leave a break for a fresh work interval, counting or not.
pub fn resume_work(state: &TimerState, settings: &Settings, now_ms: i64, auto_start: bool) -> TimerState {
    let duration = settings.work_duration;
    if auto_start {
        TimerState::running(
            Mode::Work,
            duration,
            deadline_after(now_ms, duration),
            state.sessions_completed,
            now_ms,
        )
    } else {
        TimerState::idle(Mode::Work, duration, state.sessions_completed, now_ms)
    }
}
