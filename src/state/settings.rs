//! User-configurable interval durations

use serde::{Deserialize, Serialize};

use crate::error::{FocusError, Result};

/// Shortest duration any interval may be configured to, in seconds.
pub const MIN_DURATION_SECS: u64 = 60;

/// Longest duration any interval may be configured to, in seconds.
pub const MAX_DURATION_SECS: u64 = 24 * 60 * 60;

/// Interval durations, all in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub work_duration: u64,
    pub short_break_duration: u64,
    pub long_break_duration: u64,
}

impl Settings {
    pub const DEFAULT: Settings = Settings {
        work_duration: 25 * 60,
        short_break_duration: 5 * 60,
        long_break_duration: 15 * 60,
    };

    /// Check bounds and lift a long break that is shorter than the short one.
    pub fn normalized(self) -> Result<Self> {
        for (name, value) in [
            ("work", self.work_duration),
            ("short break", self.short_break_duration),
            ("long break", self.long_break_duration),
        ] {
            if value < MIN_DURATION_SECS {
                return Err(FocusError::InvalidSettings(format!(
                    "{} duration must be at least 1 minute",
                    name
                )));
            }
            if value > MAX_DURATION_SECS {
                return Err(FocusError::InvalidSettings(format!(
                    "{} duration must be at most 24 hours",
                    name
                )));
            }
        }

        Ok(Self {
            long_break_duration: self.long_break_duration.max(self.short_break_duration),
            ..self
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Settings as entered in the settings form, in whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsInput {
    pub work_minutes: u64,
    pub short_break_minutes: u64,
    pub long_break_minutes: u64,
}

impl SettingsInput {
    pub fn into_settings(self) -> Result<Settings> {
        Settings {
            work_duration: minutes_to_secs(self.work_minutes),
            short_break_duration: minutes_to_secs(self.short_break_minutes),
            long_break_duration: minutes_to_secs(self.long_break_minutes),
        }
        .normalized()
    }
}

/// Overflow saturates, which `normalized` then rejects as too long.
fn minutes_to_secs(minutes: u64) -> u64 {
    minutes.checked_mul(60).unwrap_or(u64::MAX)
}

impl From<Settings> for SettingsInput {
    fn from(settings: Settings) -> Self {
        Self {
            work_minutes: settings.work_duration / 60,
            short_break_minutes: settings.short_break_duration / 60,
            long_break_minutes: settings.long_break_duration / 60,
        }
    }
}
