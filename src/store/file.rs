//! JSON file backed store
//!
//! The whole key space lives in one JSON object. Each write replaces the
//! file through a temporary sibling and a rename.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::{fs, sync::Mutex};
use tracing::{debug, warn};

use super::StateStore;
use crate::error::{FocusError, Result};

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl FileStore {
    /// Open the store, starting empty if the file is missing or unreadable.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Map<String, Value>>(&bytes) {
                Ok(values) => values,
                Err(e) => {
                    warn!("State file {} is malformed, starting empty: {}", path.display(), e);
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No state file at {}, starting empty", path.display());
                Map::new()
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, values: &Map<String, Value>, key: &str) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(values)
            .map_err(|e| FocusError::storage(key, e))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes)
            .await
            .map_err(|e| FocusError::storage(key, e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| FocusError::storage(key, e))
    }
}

#[async_trait]
impl StateStore for FileStore {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>> {
        let values = self.values.lock().await;
        Ok(keys
            .iter()
            .filter_map(|key| values.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, entries: Vec<(String, Value)>) -> Result<()> {
        let mut values = self.values.lock().await;
        let mut next = values.clone();
        let first_key = entries.first().map(|(k, _)| k.clone()).unwrap_or_default();
        next.extend(entries);
        self.flush(&next, &first_key).await?;
        *values = next;
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
        let mut next = values.clone();
        next.extend(entries);
        self.flush(&next, guard_key).await?;
        *values = next;
        Ok(true)
    }
}
