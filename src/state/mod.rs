//! State management module
//!
//! Records that describe the timer, the user's settings and the tab
//! snapshot, plus the pure transitions between timer records.

pub mod settings;
pub mod snapshot;
pub mod timer_state;
pub mod transition;

pub use settings::{Settings, SettingsInput, MAX_DURATION_SECS, MIN_DURATION_SECS};
pub use snapshot::{TabSnapshot, UrlPolicy};
pub use timer_state::{BreakKind, Mode, Phase, TimerState};
pub use transition::{advance, derive_remaining, Advance};
