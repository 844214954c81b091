//! Tab/window manager collaborator

use std::{
    collections::BTreeMap,
    sync::Mutex,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{
    error::{FocusError, Result},
    protocol::TabCommand,
};

pub type TabId = u64;

/// An open tab as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub tab_id: TabId,
    #[serde(default)]
    pub window_id: u64,
    pub url: String,
    #[serde(default)]
    pub active: bool,
}

/// Capabilities consumed from the host's tab manager.
#[async_trait]
pub trait TabManager: Send + Sync {
    /// Every open tab across all windows.
    async fn list_tabs(&self) -> Result<Vec<Tab>>;

    async fn get_tab(&self, tab_id: TabId) -> Result<Option<Tab>>;

    async fn navigate(&self, tab_id: TabId, url: &str) -> Result<()>;

    async fn create_tab(&self, url: &str, active: bool) -> Result<TabId>;

    async fn close_tab(&self, tab_id: TabId) -> Result<()>;

    /// The focused tab of the focused window, if any.
    async fn active_tab(&self) -> Result<Option<Tab>>;
}

#[derive(Debug, Default)]
struct TabTable {
    tabs: BTreeMap<TabId, Tab>,
    next_id: TabId,
}

impl TabTable {
    /// `next_id`, or the lowest unused id once the counter has saturated.
    fn free_id(&self) -> Result<TabId> {
        if !self.tabs.contains_key(&self.next_id) {
            return Ok(self.next_id);
        }
        (1..=TabId::MAX)
            .find(|id| !self.tabs.contains_key(id))
            .ok_or_else(|| FocusError::tab(self.next_id, "no free tab id left"))
    }

    fn activate(&mut self, tab_id: TabId) {
        let window = self.tabs.get(&tab_id).map(|t| t.window_id);
        for tab in self.tabs.values_mut() {
            if Some(tab.window_id) == window {
                tab.active = tab.tab_id == tab_id;
            }
        }
    }
}

/// Mirror of the host's tabs.
///
/// The host bridge keeps it current through `upsert`/`remove`, and applies
/// the `TabCommand`s published for every controller-initiated change.
#[derive(Debug)]
pub struct InMemoryTabs {
    table: Mutex<TabTable>,
    commands: broadcast::Sender<TabCommand>,
}

impl InMemoryTabs {
    pub fn new() -> Self {
        let (commands, _) = broadcast::channel(256);
        Self {
            table: Mutex::new(TabTable {
                tabs: BTreeMap::new(),
                next_id: 1,
            }),
            commands,
        }
    }

    pub fn subscribe_commands(&self) -> broadcast::Receiver<TabCommand> {
        self.commands.subscribe()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, TabTable>> {
        self.table
            .lock()
            .map_err(|e| FocusError::tab(0, format!("tab table poisoned: {}", e)))
    }

    fn publish(&self, command: TabCommand) {
        // Nobody listening is fine: the mirror is already updated.
        if self.commands.send(command).is_err() {
            debug!("No host bridge attached for tab commands");
        }
    }

    /// Host report: a tab exists with this URL.
    pub fn upsert(&self, tab: Tab) -> Result<()> {
        let mut table = self.lock()?;
        let tab_id = tab.tab_id;
        let active = tab.active;
        table.next_id = table.next_id.max(tab_id.saturating_add(1));
        table.tabs.insert(tab_id, tab);
        if active {
            table.activate(tab_id);
        }
        Ok(())
    }

    /// Host report: the user focused a tab.
    pub fn mark_active(&self, tab_id: TabId) -> Result<()> {
        let mut table = self.lock()?;
        if !table.tabs.contains_key(&tab_id) {
            return Err(FocusError::tab(tab_id, "no such tab"));
        }
        table.activate(tab_id);
        Ok(())
    }

    /// Host report: a tab was closed.
    pub fn remove(&self, tab_id: TabId) -> Result<bool> {
        Ok(self.lock()?.tabs.remove(&tab_id).is_some())
    }

    pub fn snapshot(&self) -> Result<Vec<Tab>> {
        Ok(self.lock()?.tabs.values().cloned().collect())
    }
}

impl Default for InMemoryTabs {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TabManager for InMemoryTabs {
    async fn list_tabs(&self) -> Result<Vec<Tab>> {
        self.snapshot()
    }

    async fn get_tab(&self, tab_id: TabId) -> Result<Option<Tab>> {
        Ok(self.lock()?.tabs.get(&tab_id).cloned())
    }

    async fn navigate(&self, tab_id: TabId, url: &str) -> Result<()> {
        {
            let mut table = self.lock()?;
            let tab = table
                .tabs
                .get_mut(&tab_id)
                .ok_or_else(|| FocusError::tab(tab_id, "no such tab"))?;
            tab.url = url.to_string();
        }
        self.publish(TabCommand::Navigate {
            tab_id,
            url: url.to_string(),
        });
        Ok(())
    }

    async fn create_tab(&self, url: &str, active: bool) -> Result<TabId> {
        let tab_id = {
            let mut table = self.lock()?;
            let tab_id = table.free_id()?;
            table.next_id = table.next_id.max(tab_id.saturating_add(1));
            let window_id = table.tabs.values().next().map(|t| t.window_id).unwrap_or(1);
            table.tabs.insert(
                tab_id,
                Tab {
                    tab_id,
                    window_id,
                    url: url.to_string(),
                    active: false,
                },
            );
            if active {
                table.activate(tab_id);
            }
            tab_id
        };
        self.publish(TabCommand::Create {
            tab_id,
            url: url.to_string(),
            active,
        });
        Ok(tab_id)
    }

    async fn close_tab(&self, tab_id: TabId) -> Result<()> {
        let removed = self.lock()?.tabs.remove(&tab_id).is_some();
        if !removed {
            warn!("Close requested for unknown tab {}", tab_id);
            return Err(FocusError::tab(tab_id, "no such tab"));
        }
        self.publish(TabCommand::Close { tab_id });
        Ok(())
    }

    async fn active_tab(&self) -> Result<Option<Tab>> {
        Ok(self.lock()?.tabs.values().find(|t| t.active).cloned())
    }
}
