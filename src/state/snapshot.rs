//! Tab snapshot taken when a break begins

use serde::{Deserialize, Serialize};

use crate::services::TabId;

/// A tab that was redirected to the break view and its original URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSnapshot {
    pub tab_id: TabId,
    pub url: String,
}

impl TabSnapshot {
    pub fn new(tab_id: TabId, url: impl Into<String>) -> Self {
        Self {
            tab_id,
            url: url.into(),
        }
    }
}

/// URLs that must never be snapshotted or redirected.
#[derive(Debug, Clone)]
pub struct UrlPolicy {
    pub break_view_url: String,
    pub privileged_prefixes: Vec<String>,
}

impl UrlPolicy {
    pub fn new(break_view_url: impl Into<String>) -> Self {
        Self {
            break_view_url: break_view_url.into(),
            privileged_prefixes: default_privileged_prefixes(),
        }
    }

    pub fn is_break_view(&self, url: &str) -> bool {
        url.starts_with(&self.break_view_url)
    }

    pub fn is_privileged(&self, url: &str) -> bool {
        url.is_empty()
            || self
                .privileged_prefixes
                .iter()
                .any(|prefix| url.starts_with(prefix.as_str()))
    }

    /// An ordinary page that a running break should cover.
    pub fn should_redirect(&self, url: &str) -> bool {
        !self.is_break_view(url) && !self.is_privileged(url)
    }
}

pub fn default_privileged_prefixes() -> Vec<String> {
    ["chrome://", "edge://", "about:", "chrome-extension://", "devtools://"]
        .iter()
        .map(|prefix| prefix.to_string())
        .collect()
}
