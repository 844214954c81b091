//! In-process store

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::StateStore;
use crate::error::{FocusError, Result};

/// Volatile store. Writes can be made to fail to exercise degraded paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set` fail until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self, key: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(FocusError::storage(key, "store is rejecting writes"));
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>> {
        let values = self.values.lock().await;
        Ok(keys
            .iter()
            .filter_map(|key| values.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, entries: Vec<(String, Value)>) -> Result<()> {
        if let Some((key, _)) = entries.first() {
            self.check_writable(key)?;
        }
        let mut values = self.values.lock().await;
        values.extend(entries);
        Ok(())
    }

    async fn set_if(
        &self,
        guard_key: &str,
        expected: &Value,
        entries: Vec<(String, Value)>,
    ) -> Result<bool> {
        let mut values = self.values.lock().await;
        if values.get(guard_key) != Some(expected) {
            return Ok(false);
        }
        self.check_writable(guard_key)?;
        values.extend(entries);
        Ok(true)
    }
}
