//! Typed access to the persisted key layout

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::warn;

use super::{keys, StateStore};
use crate::{
    error::{FocusError, Result},
    state::{Settings, TabSnapshot, TimerState},
};

/// Shared, cheaply cloned view over a `StateStore`.
#[derive(Clone)]
pub struct Records {
    backend: Arc<dyn StateStore>,
}

impl Records {
    pub fn new(backend: Arc<dyn StateStore>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn StateStore> {
        &self.backend
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut values = self.backend.get(&[key]).await?;
        match values.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| FocusError::Corrupt {
                    key: key.to_string(),
                    source,
                }),
        }
    }

    fn encode<T: Serialize>(key: &str, value: &T) -> Result<(String, Value)> {
        serde_json::to_value(value)
            .map(|v| (key.to_string(), v))
            .map_err(|source| FocusError::Corrupt {
                key: key.to_string(),
                source,
            })
    }

    /// Stored settings, or the defaults when absent, unreadable or out of
    /// bounds.
    pub async fn load_settings(&self) -> Settings {
        match self.read::<Settings>(keys::SETTINGS).await {
            Ok(Some(settings)) => match settings.normalized() {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("Ignoring stored settings: {}", e);
                    Settings::default()
                }
            },
            Ok(None) => Settings::default(),
            Err(e) => {
                warn!("Falling back to default settings: {}", e);
                Settings::default()
            }
        }
    }

    pub async fn has_settings(&self) -> Result<bool> {
        Ok(self.read::<Value>(keys::SETTINGS).await?.is_some())
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.backend
            .set(vec![Self::encode(keys::SETTINGS, settings)?])
            .await
    }

    /// Stored timer record. An unreadable record is treated as absent.
    pub async fn load_timer_state(&self) -> Result<Option<TimerState>> {
        match self.read::<TimerState>(keys::TIMER_STATE).await {
            Err(FocusError::Corrupt { key, source }) => {
                warn!("Discarding malformed {}: {}", key, source);
                Ok(None)
            }
            other => other,
        }
    }

    /// Write the timer record and mirror its session counter.
    pub async fn save_timer_state(&self, state: &TimerState) -> Result<()> {
        self.backend
            .set(vec![
                Self::encode(keys::TIMER_STATE, state)?,
                Self::encode(keys::SESSIONS_COMPLETED, &state.sessions_completed)?,
            ])
            .await
    }

    /// Overwrite the timer record only if it still equals `expected`.
    /// The mirrored session counter is left alone.
    pub async fn replace_timer_state(&self, expected: &TimerState, next: &TimerState) -> Result<bool> {
        let (_, guard) = Self::encode(keys::TIMER_STATE, expected)?;
        self.backend
            .set_if(keys::TIMER_STATE, &guard, vec![Self::encode(keys::TIMER_STATE, next)?])
            .await
    }

    /// Pending tab snapshot. Stored as a JSON-encoded string.
    pub async fn load_snapshot(&self) -> Result<Option<Vec<TabSnapshot>>> {
        let Some(encoded) = self.read::<String>(keys::ORIGINAL_TAB_URLS).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&encoded) {
            Ok(tabs) => Ok(Some(tabs)),
            Err(e) => {
                warn!("Tab snapshot is malformed, treating it as empty: {}", e);
                Ok(Some(Vec::new()))
            }
        }
    }

    pub async fn save_snapshot(&self, tabs: &[TabSnapshot]) -> Result<()> {
        let encoded = serde_json::to_string(tabs).map_err(|source| FocusError::Corrupt {
            key: keys::ORIGINAL_TAB_URLS.to_string(),
            source,
        })?;
        self.backend
            .set(vec![
                (keys::ORIGINAL_TAB_URLS.to_string(), Value::String(encoded)),
                (keys::LAST_ACTIVE_URL.to_string(), Value::Null),
            ])
            .await
    }

    /// Write the post-break record and drop the snapshot in a single write,
    /// so a repeated break exit can never find one without the other.
    pub async fn commit_break_exit(&self, state: &TimerState) -> Result<()> {
        self.backend
            .set(vec![
                Self::encode(keys::TIMER_STATE, state)?,
                Self::encode(keys::SESSIONS_COMPLETED, &state.sessions_completed)?,
                (keys::ORIGINAL_TAB_URLS.to_string(), Value::Null),
                (keys::LAST_ACTIVE_URL.to_string(), Value::Null),
            ])
            .await
    }

    pub async fn load_last_active_url(&self) -> Result<Option<String>> {
        self.read(keys::LAST_ACTIVE_URL).await
    }

    pub async fn save_last_active_url(&self, url: &str) -> Result<()> {
        self.backend
            .set(vec![(
                keys::LAST_ACTIVE_URL.to_string(),
                Value::String(url.to_string()),
            )])
            .await
    }
}
