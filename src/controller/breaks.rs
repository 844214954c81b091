//! Break enforcement: covering tabs when a break starts, keeping new tabs
//! covered while it runs, and putting everything back when it ends.

use std::collections::HashSet;

use tracing::{debug, error, info, warn};

use super::SessionController;
use crate::{
    error::Result,
    services::TabId,
    state::{transition, BreakKind, Mode, TabSnapshot, TimerState},
};

impl SessionController {
    /// Work ran out: snapshot every ordinary tab, persist the break, then
    /// send the snapshotted tabs to the break view.
    pub(super) async fn begin_break(&self, next: TimerState, kind: BreakKind) -> Result<TimerState> {
        let policy = &self.config.url_policy;

        let open_tabs = match self.tabs.list_tabs().await {
            Ok(tabs) => tabs,
            Err(e) => {
                warn!("Could not enumerate tabs for break, covering none: {}", e);
                Vec::new()
            }
        };
        let mut snapshot: Vec<TabSnapshot> = open_tabs
            .iter()
            .filter(|tab| policy.should_redirect(&tab.url))
            .map(|tab| TabSnapshot::new(tab.tab_id, tab.url.clone()))
            .collect();

        // Tabs still covered from a break that was never resumed keep their
        // original URLs.
        if let Some(previous) = self.records.load_snapshot().await? {
            let known: HashSet<TabId> = snapshot.iter().map(|t| t.tab_id).collect();
            let carried: Vec<TabSnapshot> = previous
                .into_iter()
                .filter(|t| !known.contains(&t.tab_id))
                .collect();
            if !carried.is_empty() {
                debug!("Carrying {} tabs over from an unresumed break", carried.len());
                snapshot.extend(carried);
            }
        }

        self.records.save_snapshot(&snapshot).await.map_err(|e| {
            error!("Could not store tab snapshot, break postponed to next wake: {}", e);
            e
        })?;
        self.commit(&next).await.map_err(|e| {
            error!("Could not store break state, break postponed to next wake: {}", e);
            e
        })?;

        for entry in &snapshot {
            if let Err(e) = self.tabs.navigate(entry.tab_id, &policy.break_view_url).await {
                warn!("Failed to cover tab {}: {}", entry.tab_id, e);
            }
        }

        self.schedule_wakes(next.timer_end_time, self.clock.now_ms());
        info!(
            "Work session {} complete, {:?} break of {}s over {} tabs",
            next.sessions_completed,
            kind,
            next.time_left,
            snapshot.len()
        );

        let noun = if next.sessions_completed == 1 { "session" } else { "sessions" };
        self.notifier.notify(
            "Time for a break!",
            &format!("You've completed {} {}.", next.sessions_completed, noun),
        );
        self.publish(&next);
        Ok(next)
    }

    /// Leave the break: commit the work interval together with the snapshot
    /// removal, then restore the snapshotted tabs from memory. A manual
    /// resume starts counting immediately.
    ///
    /// Safe to repeat. Tabs are only touched once the exit is stored, so each
    /// snapshot entry is restored at most once. Without a snapshot and
    /// outside break mode only stray break views are closed.
    pub async fn end_break(&self, manual_resume: bool) -> Result<TimerState> {
        let state = self.load_state().await?;
        let snapshot = self.records.load_snapshot().await?;

        if snapshot.is_none() && state.mode == Mode::Work {
            debug!("Break already ended, closing leftover break views");
            self.close_break_views(&HashSet::new()).await;
            return Ok(state);
        }

        let snapshot = snapshot.unwrap_or_else(|| {
            warn!("No tab snapshot found for break exit, nothing to restore");
            Vec::new()
        });
        let last_active = match self.records.load_last_active_url().await {
            Ok(url) => url,
            Err(e) => {
                warn!("Could not read last active URL: {}", e);
                None
            }
        };

        let settings = self.records.load_settings().await;
        let next = transition::resume_work(&state, &settings, self.clock.now_ms(), manual_resume);
        if let Err(e) = self.records.commit_break_exit(&next).await {
            error!("Could not record break exit, tabs left covered: {}", e);
            return Err(e);
        }
        self.clear_provisional();
        self.cancel_wakes();

        let restored = self.restore_tabs(&snapshot, last_active).await;
        self.close_break_views(&restored).await;
        if next.is_running {
            self.schedule_wakes(next.timer_end_time, next.timestamp);
        }
        info!(
            "Break ended ({}), {} tabs restored, work timer {}",
            if manual_resume { "manual resume" } else { "automatic" },
            restored.len(),
            if next.is_running { "running" } else { "idle" }
        );
        self.publish(&next);
        Ok(next)
    }

    /// Keep a break covering tabs opened or navigated after it started.
    /// Returns whether the tab was redirected.
    pub async fn enforce_on_tab(&self, tab_id: TabId, url: Option<String>) -> Result<bool> {
        let state = self.load_state().await?;
        let now = self.clock.now_ms();
        if !state.is_break_running() || now >= state.timer_end_time {
            return Ok(false);
        }

        // An activation report may be stale by the time it is handled; only
        // the tab that still has focus is covered.
        let url = match url {
            Some(url) => url,
            None => match self.tabs.active_tab().await {
                Ok(Some(tab)) if tab.tab_id == tab_id => tab.url,
                Ok(_) => {
                    debug!("Tab {} no longer active, not covering it", tab_id);
                    return Ok(false);
                }
                Err(e) => {
                    warn!("Could not inspect tab {}: {}", tab_id, e);
                    return Ok(false);
                }
            },
        };

        let policy = &self.config.url_policy;
        if !policy.should_redirect(&url) {
            return Ok(false);
        }

        if let Err(e) = self.records.save_last_active_url(&url).await {
            warn!("Could not remember {} for after the break: {}", url, e);
        }
        match self.tabs.navigate(tab_id, &policy.break_view_url).await {
            Ok(()) => {
                info!("Redirected tab {} to the break view during break", tab_id);
                Ok(true)
            }
            Err(e) => {
                warn!("Failed to redirect tab {}: {}", tab_id, e);
                Ok(false)
            }
        }
    }

    /// Put each snapshotted tab back, re-creating the ones that were closed.
    /// Per-tab failures are logged and skipped.
    async fn restore_tabs(&self, snapshot: &[TabSnapshot], last_active: Option<String>) -> HashSet<TabId> {
        let mut restored = HashSet::new();

        for entry in snapshot {
            let outcome = match self.tabs.get_tab(entry.tab_id).await {
                Ok(Some(_)) => self
                    .tabs
                    .navigate(entry.tab_id, &entry.url)
                    .await
                    .map(|_| entry.tab_id),
                Ok(None) => self.tabs.create_tab(&entry.url, false).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(tab_id) => {
                    restored.insert(tab_id);
                }
                Err(e) => warn!("Failed to restore {}: {}", entry.url, e),
            }
        }

        if let Some(url) = last_active.filter(|url| !snapshot.iter().any(|t| &t.url == url)) {
            match self.tabs.create_tab(&url, false).await {
                Ok(tab_id) => {
                    restored.insert(tab_id);
                }
                Err(e) => warn!("Failed to reopen {}: {}", url, e),
            }
        }

        restored
    }

    /// Close every tab still showing the break view, once each.
    async fn close_break_views(&self, keep: &HashSet<TabId>) {
        let policy = &self.config.url_policy;
        let tabs = match self.tabs.list_tabs().await {
            Ok(tabs) => tabs,
            Err(e) => {
                warn!("Could not enumerate break views: {}", e);
                return;
            }
        };

        let mut closed = HashSet::new();
        for tab in tabs {
            if !policy.is_break_view(&tab.url) || keep.contains(&tab.tab_id) {
                continue;
            }
            if !closed.insert(tab.tab_id) {
                continue;
            }
            if let Err(e) = self.tabs.close_tab(tab.tab_id).await {
                warn!("Failed to close break view {}: {}", tab.tab_id, e);
            }
        }
        if !closed.is_empty() {
            debug!("Closed {} break views", closed.len());
        }
    }
}
