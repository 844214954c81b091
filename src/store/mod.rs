//! Durable key/value state store
//!
//! The store has no logic of its own. Every context reads and writes the
//! same keys with last-write-wins semantics; `Records` gives those keys
//! their types.

pub mod file;
pub mod memory;
pub mod records;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use records::Records;

/// Persisted key layout.
pub mod keys {
    pub const SETTINGS: &str = "settings";
    pub const TIMER_STATE: &str = "timerState";
    pub const SESSIONS_COMPLETED: &str = "sessionsCompleted";
    pub const ORIGINAL_TAB_URLS: &str = "originalTabUrls";
    pub const LAST_ACTIVE_URL: &str = "lastActiveUrl";
}

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Fetch the requested keys. Missing keys are simply absent from the map.
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>>;

    /// Write all entries in one call.
    async fn set(&self, entries: Vec<(String, Value)>) -> Result<()>;

    /// Write `entries` only while `guard_key` still holds `expected`, checked
    /// and written under one lock. Returns whether the write happened.
    async fn set_if(
        &self,
        guard_key: &str,
        expected: &Value,
        entries: Vec<(String, Value)>,
    ) -> Result<bool>;
}
