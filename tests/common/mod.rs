//! Shared fixtures: a controller wired to in-memory collaborators and a
//! manual clock.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use serene_focus::{
    clock::{Clock, ManualClock},
    config::ControllerConfig,
    controller::SessionController,
    services::{InMemoryTabs, Notifier, Tab, TabId, TabManager, WakeScheduler, WakeSpec},
    store::{MemoryStore, Records},
};

pub const BREAK_URL: &str = "serene-focus://break";

/// Remembers every wake request instead of sleeping.
#[derive(Default)]
pub struct RecordingWakes {
    pub pending: Mutex<HashMap<String, WakeSpec>>,
    pub cancelled: Mutex<Vec<String>>,
}

impl RecordingWakes {
    pub fn pending_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pending.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get(&self, name: &str) -> Option<WakeSpec> {
        self.pending.lock().unwrap().get(name).copied()
    }
}

impl WakeScheduler for RecordingWakes {
    fn schedule(&self, name: &str, spec: WakeSpec) {
        self.pending.lock().unwrap().insert(name.to_string(), spec);
    }

    fn cancel(&self, name: &str) {
        self.pending.lock().unwrap().remove(name);
        self.cancelled.lock().unwrap().push(name.to_string());
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn titles(&self) -> Vec<String> {
        self.messages.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
    }
}

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
    pub records: Records,
    pub tabs: Arc<InMemoryTabs>,
    pub wakes: Arc<RecordingWakes>,
    pub notifier: Arc<RecordingNotifier>,
    pub controller: Arc<SessionController>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_tab_manager(None)
    }

    /// Build with a custom tab manager in front of the mirror.
    pub fn with_tab_manager(tab_manager: Option<Arc<dyn TabManager>>) -> Self {
        let clock = Arc::new(ManualClock::new(0));
        let store = Arc::new(MemoryStore::new());
        let records = Records::new(store.clone());
        let tabs = Arc::new(InMemoryTabs::new());
        let wakes = Arc::new(RecordingWakes::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let tab_manager: Arc<dyn TabManager> = tab_manager.unwrap_or_else(|| tabs.clone() as Arc<dyn TabManager>);

        let controller = Arc::new(SessionController::new(
            records.clone(),
            tab_manager,
            wakes.clone(),
            notifier.clone(),
            clock.clone() as Arc<dyn Clock>,
            ControllerConfig::default(),
        ));

        Self {
            clock,
            store,
            records,
            tabs,
            wakes,
            notifier,
            controller,
        }
    }

    pub fn open_tab(&self, tab_id: TabId, url: &str) {
        self.tabs
            .upsert(Tab {
                tab_id,
                window_id: 1,
                url: url.to_string(),
                active: false,
            })
            .unwrap();
    }

    pub fn tab_url(&self, tab_id: TabId) -> Option<String> {
        self.tabs
            .snapshot()
            .unwrap()
            .into_iter()
            .find(|t| t.tab_id == tab_id)
            .map(|t| t.url)
    }

    pub fn urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.tabs.snapshot().unwrap().into_iter().map(|t| t.url).collect();
        urls.sort();
        urls
    }

    pub fn dyn_clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Start a work interval at the current time and jump to its deadline.
    pub async fn run_work_to_deadline(&self) {
        let started = self.controller.start().await.unwrap();
        self.clock.set(started.timer_end_time);
    }
}
