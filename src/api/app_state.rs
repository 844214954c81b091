//! Shared state behind the HTTP handlers

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};

use crate::{
    clock::Clock,
    controller::ControllerHandle,
    error::Result,
    observer::TimerView,
    protocol::{Intent, Reply},
    services::InMemoryTabs,
    state::TimerState,
    store::Records,
};

/// Everything a handler needs: the controller's queue, read access to the
/// store, and the tab mirror the host bridge keeps current.
pub struct AppState {
    pub controller: ControllerHandle,
    pub records: Records,
    pub tabs: Arc<InMemoryTabs>,
    pub clock: Arc<dyn Clock>,
    pub reply_timeout: Duration,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    last_action: Mutex<Option<(String, DateTime<Utc>)>>,
}

impl AppState {
    pub fn new(
        controller: ControllerHandle,
        records: Records,
        tabs: Arc<InMemoryTabs>,
        clock: Arc<dyn Clock>,
        reply_timeout: Duration,
        port: u16,
        host: String,
    ) -> Self {
        Self {
            controller,
            records,
            tabs,
            clock,
            reply_timeout,
            start_time: Instant::now(),
            port,
            host,
            last_action: Mutex::new(None),
        }
    }

    /// Ask the controller, giving up after the reply timeout.
    pub async fn request(&self, intent: Intent) -> Option<Reply> {
        self.controller.request(intent, self.reply_timeout).await
    }

    pub fn record_action(&self, action: &str) {
        if let Ok(mut last) = self.last_action.lock() {
            *last = Some((action.to_string(), Utc::now()));
        }
    }

    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        match self.last_action.lock().ok().and_then(|last| last.clone()) {
            Some((action, at)) => (Some(action), Some(at)),
            None => (None, None),
        }
    }

    /// View of a record just returned by the controller.
    pub async fn view_of(&self, state: &TimerState) -> Result<TimerView> {
        let pending = self.records.load_snapshot().await?.is_some();
        Ok(TimerView::from_state(state, pending, self.clock.now_ms()))
    }

    /// View of whatever the store holds now; works without the controller.
    pub async fn current_view(&self) -> Result<TimerView> {
        let state = match self.records.load_timer_state().await? {
            Some(state) => state,
            None => TimerState::initial(&self.records.load_settings().await, self.clock.now_ms()),
        };
        self.view_of(&state).await
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}
