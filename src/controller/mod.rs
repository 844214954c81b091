//! Session controller
//!
//! Owns the timer state machine. Every operation re-reads the stored record
//! and decides from its absolute deadline, so nothing here assumes it ran
//! continuously since the previous call.

pub mod actor;
mod breaks;

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::{
    clock::Clock,
    config::ControllerConfig,
    error::Result,
    protocol::{Broadcast, Intent, Reply},
    services::{Notifier, TabManager, WakeScheduler, WakeSpec, DEADLINE_WAKE, TICK_WAKE},
    state::{
        advance, derive_remaining, transition, Advance, Phase, Settings, SettingsInput,
        TimerState,
    },
    store::Records,
};

pub use actor::{ControllerHandle, Envelope};

pub struct SessionController {
    records: Records,
    tabs: Arc<dyn TabManager>,
    wakes: Arc<dyn WakeScheduler>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    config: ControllerConfig,
    events: broadcast::Sender<Broadcast>,
    /// Last record that failed to persist; newer than what the store holds.
    provisional: Mutex<Option<TimerState>>,
}

impl SessionController {
    pub fn new(
        records: Records,
        tabs: Arc<dyn TabManager>,
        wakes: Arc<dyn WakeScheduler>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: ControllerConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(100);
        Self {
            records,
            tabs,
            wakes,
            notifier,
            clock,
            config,
            events,
            provisional: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Broadcast> {
        self.events.subscribe()
    }

    pub(crate) fn events(&self) -> broadcast::Sender<Broadcast> {
        self.events.clone()
    }

    /// Seed settings and the timer record on first run.
    pub async fn initialize(&self) -> Result<TimerState> {
        if !self.records.has_settings().await? {
            info!("First run, storing default settings");
            self.records.save_settings(&Settings::default()).await?;
        }
        self.load_state().await
    }

    /// Handle one intent and build its reply.
    pub async fn handle(&self, intent: Intent) -> Result<Reply> {
        let state = match intent {
            Intent::Start => self.start().await?,
            Intent::Pause => self.pause().await?,
            Intent::Reset => self.reset().await?,
            Intent::BreakEnded { manual_resume } => self.end_break(manual_resume).await?,
            Intent::CheckExpiry => self.check_expiry().await?,
            Intent::TabActivated { tab_id } => {
                self.enforce_on_tab(tab_id, None).await?;
                self.load_state().await?
            }
            Intent::TabNavigated { tab_id, url } => {
                self.enforce_on_tab(tab_id, Some(url)).await?;
                self.load_state().await?
            }
            Intent::GetState => self.load_state().await?,
            Intent::SaveSettings { settings } => {
                let settings = self.save_settings(settings).await?;
                return Ok(Reply::Settings { settings });
            }
        };
        Ok(Reply::State { state })
    }

    /// Current record, preferring one that has not reached the store yet.
    /// A missing record is re-seeded rather than left empty.
    pub async fn load_state(&self) -> Result<TimerState> {
        if let Some(pending) = self.take_provisional() {
            match self.records.save_timer_state(&pending).await {
                Ok(()) => info!("Persisted deferred timer state"),
                Err(e) => {
                    warn!("Timer state still not persisted: {}", e);
                    self.set_provisional(pending.clone());
                }
            }
            return Ok(pending);
        }

        match self.records.load_timer_state().await? {
            Some(state) => Ok(state),
            None => {
                let settings = self.records.load_settings().await;
                let state = TimerState::initial(&settings, self.clock.now_ms());
                info!("No timer state stored, seeding an idle work interval");
                self.records.save_timer_state(&state).await?;
                Ok(state)
            }
        }
    }

    pub async fn phase(&self) -> Result<Phase> {
        let state = self.load_state().await?;
        let pending = self.records.load_snapshot().await?.is_some();
        Ok(Phase::of(&state, pending))
    }

    pub async fn start(&self) -> Result<TimerState> {
        let now = self.clock.now_ms();
        let state = self.load_state().await?;
        let Some(next) = transition::start(&state, now) else {
            debug!("Start ignored, {} timer already running", state.mode.as_str());
            return Ok(state);
        };

        self.persist_or_defer(&next).await;
        self.schedule_wakes(next.timer_end_time, now);
        info!(
            "Started {} timer, {}s until {}",
            next.mode.as_str(),
            next.time_left,
            next.timer_end_time
        );
        self.publish(&next);
        Ok(next)
    }

    pub async fn pause(&self) -> Result<TimerState> {
        let now = self.clock.now_ms();
        let state = self.load_state().await?;
        let Some(next) = transition::pause(&state, now) else {
            debug!("Pause ignored, timer is not running");
            return Ok(state);
        };

        self.cancel_wakes();
        self.persist_or_defer(&next).await;
        info!("Paused {} timer with {}s left", next.mode.as_str(), next.time_left);
        self.publish(&next);
        Ok(next)
    }

    pub async fn reset(&self) -> Result<TimerState> {
        let now = self.clock.now_ms();
        self.cancel_wakes();
        let state = self.load_state().await?;
        let settings = self.records.load_settings().await;
        let next = transition::reset(&state, &settings, now);

        self.persist_or_defer(&next).await;
        info!("Reset {} timer to {}s", next.mode.as_str(), next.time_left);
        self.publish(&next);
        Ok(next)
    }

    /// Wake handler. Commits at most one transition per expiry; repeated
    /// calls after the first find nothing to do.
    pub async fn check_expiry(&self) -> Result<TimerState> {
        let now = self.clock.now_ms();
        let state = self.load_state().await?;
        let settings = self.records.load_settings().await;

        match advance(&state, &settings, now) {
            Advance::Idle => {
                debug!("Wake with idle timer, nothing to do");
                Ok(state)
            }
            Advance::Pending { remaining } => {
                debug!("Wake with {}s left on {} timer", remaining, state.mode.as_str());
                Ok(state)
            }
            Advance::WorkCompleted { next, kind } => self.begin_break(next, kind).await,
            Advance::BreakCompleted { next } => self.finish_break(next).await,
        }
    }

    /// Validate, persist and apply new durations.
    pub async fn save_settings(&self, input: SettingsInput) -> Result<Settings> {
        let settings = input.into_settings()?;
        self.records.save_settings(&settings).await?;
        info!(
            "Saved settings: work={}s short={}s long={}s",
            settings.work_duration, settings.short_break_duration, settings.long_break_duration
        );
        if self
            .events
            .send(Broadcast::SettingsChanged { settings })
            .is_err()
        {
            debug!("No observers attached for settings change");
        }

        let state = self.load_state().await?;
        if !state.is_running {
            let mut next = state.clone();
            next.time_left = state.full_duration(&settings);
            next.timestamp = self.clock.now_ms();
            if !next.same_timer(&state) {
                self.persist_or_defer(&next).await;
                self.publish(&next);
            }
        }
        Ok(settings)
    }

    /// Seconds left right now, derived from the stored deadline.
    pub async fn remaining(&self) -> Result<u64> {
        let state = self.load_state().await?;
        Ok(derive_remaining(&state, self.clock.now_ms()))
    }

    async fn finish_break(&self, next: TimerState) -> Result<TimerState> {
        if let Err(e) = self.commit(&next).await {
            error!("Could not record end of break, will retry on next wake: {}", e);
            return Err(e);
        }
        self.cancel_wakes();
        info!("Break over, waiting for resume");
        self.notifier
            .notify("Break Time Over!", "Time to get back to work!");
        self.publish(&next);
        Ok(next)
    }

    /// Re-arm both wakes for a running record, e.g. after a restart.
    pub fn rearm_wakes(&self, state: &TimerState) {
        if state.is_running {
            self.schedule_wakes(state.timer_end_time, self.clock.now_ms());
        }
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    fn schedule_wakes(&self, end_ms: i64, now_ms: i64) {
        let period = self.config.wake_interval;
        self.wakes.schedule(
            TICK_WAKE,
            WakeSpec::Recurring {
                first_at_ms: transition::deadline_after(now_ms, period.as_secs()),
                period,
            },
        );
        self.wakes.schedule(DEADLINE_WAKE, WakeSpec::Once { at_ms: end_ms });
    }

    fn cancel_wakes(&self) {
        self.wakes.cancel(TICK_WAKE);
        self.wakes.cancel(DEADLINE_WAKE);
    }

    /// Persist a record other contexts depend on. Failure aborts the caller.
    async fn commit(&self, state: &TimerState) -> Result<()> {
        self.records.save_timer_state(state).await?;
        self.clear_provisional();
        Ok(())
    }

    /// Persist a record other contexts do not depend on; on failure keep it
    /// and retry on the next read.
    async fn persist_or_defer(&self, state: &TimerState) {
        match self.records.save_timer_state(state).await {
            Ok(()) => self.clear_provisional(),
            Err(e) => {
                warn!("Deferring timer state write: {}", e);
                self.set_provisional(state.clone());
            }
        }
    }

    fn publish(&self, state: &TimerState) {
        let message = Broadcast::StateChanged {
            state: state.clone(),
        };
        if self.events.send(message).is_err() {
            debug!("No observers attached for state change");
        }
    }

    fn take_provisional(&self) -> Option<TimerState> {
        self.provisional.lock().ok().and_then(|mut p| p.take())
    }

    fn set_provisional(&self, state: TimerState) {
        if let Ok(mut provisional) = self.provisional.lock() {
            *provisional = Some(state);
        }
    }

    fn clear_provisional(&self) {
        if let Ok(mut provisional) = self.provisional.lock() {
            *provisional = None;
        }
    }
}
