//! Observer reconciliation
//!
//! A popup or break view attaches, renders, and goes away at any time. It
//! keeps a disposable copy of the last published record and re-derives the
//! countdown from the stored deadline on every tick, so it stays correct
//! even when broadcasts are missed or the controller is not running.

pub mod view;

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::broadcast::{self, error::TryRecvError},
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    clock::Clock,
    controller::ControllerHandle,
    error::Result,
    protocol::{Broadcast, Intent, Reply},
    state::{derive_remaining, Settings, SettingsInput, TimerState},
    store::Records,
};

pub use view::{badge_text, format_clock, TimerView};

/// How often an observer re-writes its coarse snapshot of the timer.
pub const PERSIST_EVERY_MS: i64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverKind {
    Popup,
    BreakView,
}

pub struct Observer {
    kind: ObserverKind,
    records: Records,
    handle: ControllerHandle,
    clock: Arc<dyn Clock>,
    events: broadcast::Receiver<Broadcast>,
    state: TimerState,
    settings: Settings,
    snapshot_pending: bool,
    /// Set when a broadcast changed the record or messages were lost.
    stale: bool,
    last_persist_ms: i64,
    /// Deadline the controller was already asked to complete.
    healed_deadline: Option<i64>,
}

impl Observer {
    /// Read the current record and settings and reconcile against the clock.
    pub async fn attach(
        kind: ObserverKind,
        records: Records,
        handle: ControllerHandle,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let events = handle.subscribe();
        let settings = records.load_settings().await;
        let now = clock.now_ms();
        let state = match records.load_timer_state().await? {
            Some(state) => state,
            None => TimerState::initial(&settings, now),
        };
        let snapshot_pending = records.load_snapshot().await?.is_some();

        let mut observer = Self {
            kind,
            records,
            handle,
            clock,
            events,
            state,
            settings,
            snapshot_pending,
            stale: false,
            last_persist_ms: now,
            healed_deadline: None,
        };
        debug!(
            "{:?} attached: {} timer, {}s left",
            kind,
            observer.state.mode.as_str(),
            observer.remaining()
        );
        observer.heal_if_expired();
        Ok(observer)
    }

    pub fn kind(&self) -> ObserverKind {
        self.kind
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn remaining(&self) -> u64 {
        derive_remaining(&self.state, self.clock.now_ms())
    }

    pub fn view(&self) -> TimerView {
        TimerView::from_state(&self.state, self.snapshot_pending, self.clock.now_ms())
    }

    /// One render step: apply broadcasts, self-heal, occasionally persist.
    pub async fn tick(&mut self) -> TimerView {
        self.drain_events();
        if self.stale {
            self.refresh().await;
        }
        self.heal_if_expired();

        let now = self.clock.now_ms();
        if now - self.last_persist_ms >= PERSIST_EVERY_MS {
            self.last_persist_ms = now;
            self.persist_coarse(now).await;
        }
        self.view()
    }

    /// Tick every `every` until the controller goes away.
    pub async fn run<F>(mut self, every: Duration, mut on_tick: F)
    where
        F: FnMut(&TimerView) + Send,
    {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        while !self.handle.is_closed() {
            ticker.tick().await;
            let view = self.tick().await;
            on_tick(&view);
        }
        info!("{:?} detached, controller is gone", self.kind);
    }

    pub fn start(&self) -> bool {
        self.handle.send(Intent::Start)
    }

    pub fn pause(&self) -> bool {
        self.handle.send(Intent::Pause)
    }

    pub fn reset(&self) -> bool {
        self.handle.send(Intent::Reset)
    }

    /// Start/Pause button.
    pub fn toggle(&self) -> bool {
        if self.state.is_running {
            self.pause()
        } else {
            self.start()
        }
    }

    /// Resume-from-break button. Waits at most `wait` for the controller.
    pub async fn resume(&self, wait: Duration) -> Option<Reply> {
        self.handle
            .request(Intent::BreakEnded { manual_resume: true }, wait)
            .await
    }

    pub async fn save_settings(&self, input: SettingsInput, wait: Duration) -> Option<Reply> {
        self.handle
            .request(Intent::SaveSettings { settings: input }, wait)
            .await
    }

    fn drain_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(Broadcast::StateChanged { state }) => {
                    self.state = state;
                    self.healed_deadline = None;
                    self.stale = true;
                }
                Ok(Broadcast::SettingsChanged { settings }) => self.settings = settings,
                Err(TryRecvError::Lagged(missed)) => {
                    warn!("{:?} missed {} broadcasts, re-reading state", self.kind, missed);
                    self.stale = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    /// Re-read the store after missed or state-changing broadcasts.
    async fn refresh(&mut self) {
        match self.records.load_timer_state().await {
            Ok(Some(stored)) if stored.timestamp >= self.state.timestamp => self.state = stored,
            Ok(_) => {}
            Err(e) => {
                warn!("{:?} could not re-read timer state: {}", self.kind, e);
                return;
            }
        }
        match self.records.load_snapshot().await {
            Ok(snapshot) => self.snapshot_pending = snapshot.is_some(),
            Err(e) => warn!("{:?} could not read tab snapshot: {}", self.kind, e),
        }
        self.stale = false;
    }

    /// Ask the controller to complete an expired timer instead of showing a
    /// stuck zero. Asked once per deadline.
    fn heal_if_expired(&mut self) {
        if !self.state.is_running || self.remaining() > 0 {
            return;
        }
        let deadline = self.state.timer_end_time;
        if self.healed_deadline == Some(deadline) {
            return;
        }
        info!("{:?} found an expired timer, requesting completion", self.kind);
        self.healed_deadline = Some(deadline);
        self.handle.send(Intent::CheckExpiry);
    }

    /// Refresh the stored remaining time while the record still describes
    /// the interval this observer is showing. If the store has moved on,
    /// adopt its record instead. The write only lands if the record is
    /// unchanged since it was read, so a transition committed in between
    /// is never overwritten.
    async fn persist_coarse(&mut self, now: i64) {
        let stored = match self.records.load_timer_state().await {
            Ok(stored) => stored,
            Err(e) => {
                warn!("{:?} could not read timer state: {}", self.kind, e);
                return;
            }
        };

        match stored {
            Some(stored)
                if stored.is_running
                    && stored.mode == self.state.mode
                    && stored.timer_end_time == self.state.timer_end_time =>
            {
                let refreshed = TimerState {
                    time_left: derive_remaining(&stored, now),
                    timestamp: now,
                    ..stored
                };
                match self.records.replace_timer_state(&stored, &refreshed).await {
                    Ok(true) => self.state = refreshed,
                    Ok(false) => {
                        debug!("{:?} skipped persist, record changed underneath", self.kind);
                        self.stale = true;
                    }
                    Err(e) => warn!("{:?} could not persist timer snapshot: {}", self.kind, e),
                }
            }
            Some(stored) if !stored.same_timer(&self.state) => {
                debug!("{:?} adopting newer stored state", self.kind);
                self.state = stored;
                self.healed_deadline = None;
                self.stale = true;
            }
            _ => {}
        }
    }
}
