//! Observer reconciliation against the store and the controller.

#[path = "../common/mod.rs"]
mod common;

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use common::Harness;
use serde_json::Value;
use serene_focus::{
    clock::ManualClock,
    controller::{actor, SessionController},
    error::Result,
    observer::{Observer, ObserverKind, PERSIST_EVERY_MS},
    protocol::{Broadcast, Reply},
    state::{Mode, Phase, SettingsInput, TimerState},
    store::{MemoryStore, Records, StateStore},
};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

async fn attach(h: &Harness, kind: ObserverKind) -> (Observer, actor::ControllerHandle) {
    let (handle, _task) = actor::spawn(h.controller.clone(), 16);
    let observer = Observer::attach(kind, h.records.clone(), handle.clone(), h.dyn_clock())
        .await
        .unwrap();
    (observer, handle)
}

#[tokio::test]
async fn attach_completes_an_expired_timer() {
    let h = Harness::new();
    h.controller.initialize().await.unwrap();
    h.run_work_to_deadline().await;
    h.clock.advance_secs(120);

    let mut events = h.controller.subscribe();
    let (_observer, _handle) = attach(&h, ObserverKind::Popup).await;

    let broadcast = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    match broadcast {
        Broadcast::StateChanged { state } => {
            assert_eq!(state.mode, Mode::Break);
            assert_eq!(state.sessions_completed, 1);
        }
        other => panic!("unexpected broadcast: {:?}", other),
    }
}

#[tokio::test]
async fn countdown_is_derived_on_every_tick() {
    let h = Harness::new();
    h.controller.initialize().await.unwrap();
    h.controller.start().await.unwrap();
    h.clock.set(100_000);

    let (mut observer, _handle) = attach(&h, ObserverKind::Popup).await;
    assert_eq!(observer.view().time_left, 1400);
    assert_eq!(observer.view().clock, "23:20");

    h.clock.advance_ms(2_500);
    let view = observer.tick().await;
    assert_eq!(view.time_left, 1398);
    assert_eq!(view.phase, Phase::WorkRunning);
    assert_eq!(view.badge, "24");
}

#[tokio::test]
async fn running_observer_persists_coarse_snapshot() {
    let h = Harness::new();
    h.controller.initialize().await.unwrap();
    let started = h.controller.start().await.unwrap();

    let (mut observer, _handle) = attach(&h, ObserverKind::BreakView).await;
    h.clock.advance_ms(PERSIST_EVERY_MS + 1_000);
    observer.tick().await;

    let stored = h.records.load_timer_state().await.unwrap().unwrap();
    assert_eq!(stored.timer_end_time, started.timer_end_time);
    assert_eq!(stored.time_left, 1494);
    assert!(stored.is_running);
}

/// Lets the controller complete the work interval between an observer's
/// read and its conditional write.
struct ExpiresMidPersist {
    inner: Arc<MemoryStore>,
    controller: Arc<SessionController>,
    clock: Arc<ManualClock>,
    deadline: i64,
    fired: AtomicBool,
}

#[async_trait]
impl StateStore for ExpiresMidPersist {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>> {
        self.inner.get(keys).await
    }

    async fn set(&self, entries: Vec<(String, Value)>) -> Result<()> {
        self.inner.set(entries).await
    }

    async fn set_if(
        &self,
        guard_key: &str,
        expected: &Value,
        entries: Vec<(String, Value)>,
    ) -> Result<bool> {
        if !self.fired.swap(true, Ordering::SeqCst) {
            self.clock.set(self.deadline);
            self.controller.check_expiry().await?;
        }
        self.inner.set_if(guard_key, expected, entries).await
    }
}

#[tokio::test]
async fn coarse_persist_never_undoes_a_committed_transition() {
    let h = Harness::new();
    h.open_tab(1, "https://example.com");
    h.controller.initialize().await.unwrap();
    let started = h.controller.start().await.unwrap();

    let racing = Arc::new(ExpiresMidPersist {
        inner: h.store.clone(),
        controller: h.controller.clone(),
        clock: h.clock.clone(),
        deadline: started.timer_end_time,
        fired: AtomicBool::new(false),
    });
    let (handle, _task) = actor::spawn(h.controller.clone(), 16);
    let mut observer = Observer::attach(ObserverKind::Popup, Records::new(racing), handle, h.dyn_clock())
        .await
        .unwrap();

    h.clock.set(started.timer_end_time - 1_000);
    observer.tick().await;

    let stored = h.records.load_timer_state().await.unwrap().unwrap();
    assert_eq!(stored.mode, Mode::Break);
    assert_eq!(stored.sessions_completed, 1);

    // The next wake has nothing left to complete.
    h.controller.check_expiry().await.unwrap();
    assert_eq!(h.notifier.titles(), vec!["Time for a break!".to_string()]);

    let view = observer.tick().await;
    assert_eq!(view.phase, Phase::BreakRunning);
    assert_eq!(view.sessions_completed, 1);
}

#[tokio::test]
async fn observer_adopts_record_changed_behind_its_back() {
    let h = Harness::new();
    h.controller.initialize().await.unwrap();
    h.controller.start().await.unwrap();
    let (mut observer, _handle) = attach(&h, ObserverKind::Popup).await;

    // Another context paused without a broadcast reaching this observer.
    h.clock.advance_secs(10);
    let paused = TimerState::idle(Mode::Work, 1490, 0, 10_000);
    h.records.save_timer_state(&paused).await.unwrap();

    h.clock.advance_ms(PERSIST_EVERY_MS);
    observer.tick().await;
    observer.tick().await;

    assert!(!observer.state().is_running);
    assert_eq!(observer.view().time_left, 1490);
    assert_eq!(h.records.load_timer_state().await.unwrap(), Some(paused));
}

#[tokio::test]
async fn broadcast_replaces_local_copy() {
    let h = Harness::new();
    h.controller.initialize().await.unwrap();
    let (mut observer, handle) = attach(&h, ObserverKind::Popup).await;
    assert!(!observer.state().is_running);

    let reply = handle
        .request(serene_focus::protocol::Intent::Start, WAIT)
        .await
        .unwrap();
    let Reply::State { state: started } = reply else {
        panic!("expected a state reply");
    };

    let view = observer.tick().await;
    assert!(view.is_running);
    assert_eq!(observer.state(), &started);
}

#[tokio::test]
async fn resume_button_leaves_the_break() {
    let h = Harness::new();
    h.open_tab(1, "https://example.com");
    h.controller.initialize().await.unwrap();
    h.run_work_to_deadline().await;
    h.controller.check_expiry().await.unwrap();

    let (mut observer, _handle) = attach(&h, ObserverKind::BreakView).await;
    assert_eq!(observer.view().phase, Phase::BreakRunning);

    let reply = observer.resume(WAIT).await.unwrap();
    let Reply::State { state } = reply else {
        panic!("expected a state reply");
    };
    assert_eq!(state.mode, Mode::Work);
    assert!(state.is_running);

    let view = observer.tick().await;
    assert_eq!(view.phase, Phase::WorkRunning);
    assert_eq!(h.tab_url(1).as_deref(), Some("https://example.com"));
}

#[tokio::test]
async fn settings_form_reports_rejection() {
    let h = Harness::new();
    h.controller.initialize().await.unwrap();
    let (mut observer, _handle) = attach(&h, ObserverKind::Popup).await;

    let bad = SettingsInput {
        work_minutes: 25,
        short_break_minutes: 0,
        long_break_minutes: 15,
    };
    assert!(matches!(
        observer.save_settings(bad, WAIT).await,
        Some(Reply::Rejected { .. })
    ));

    let good = SettingsInput {
        work_minutes: 30,
        short_break_minutes: 5,
        long_break_minutes: 15,
    };
    assert!(matches!(
        observer.save_settings(good, WAIT).await,
        Some(Reply::Settings { .. })
    ));

    let view = observer.tick().await;
    assert_eq!(observer.settings().work_duration, 1800);
    assert_eq!(view.time_left, 1800);
}

#[tokio::test]
async fn intents_are_dropped_quietly_once_controller_is_gone() {
    let h = Harness::new();
    h.controller.initialize().await.unwrap();
    let (handle, task) = actor::spawn(h.controller.clone(), 4);
    let observer = Observer::attach(ObserverKind::Popup, h.records.clone(), handle, h.dyn_clock())
        .await
        .unwrap();

    task.abort();
    let _ = task.await;

    assert!(!observer.start());
    assert!(observer.resume(Duration::from_millis(50)).await.is_none());
}
