//! Property-based tests for recovery after the host was suspended.
//!
//! A persisted running timer whose deadline passed while nothing was awake
//! must be completed on recovery, producing the same record an on-time
//! wake would have produced.

#[path = "../common/mod.rs"]
mod common;

use common::Harness;
use proptest::prelude::*;
use serene_focus::{
    state::{Mode, Phase, TimerState},
    tasks::recover_on_startup,
};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
}

/// Persist `stored`, then recover with the clock at `now`.
async fn recover_at(stored: &TimerState, now: i64) -> TimerState {
    let h = Harness::new();
    h.records.save_timer_state(stored).await.unwrap();
    h.clock.set(now);
    recover_on_startup(&h.controller).await.unwrap()
}

#[test]
fn ten_minutes_late_matches_on_time() {
    runtime().block_on(async {
        let deadline = 1_700_000_000_000;
        let stored = TimerState::running(Mode::Work, 1500, deadline, 0, deadline - 1_500_000);

        let on_time = recover_at(&stored, deadline).await;
        let late = recover_at(&stored, deadline + 600_000).await;

        assert_eq!(on_time.mode, Mode::Break);
        assert_eq!(on_time.sessions_completed, 1);
        assert!(late.same_timer(&on_time));
    });
}

#[test]
fn recovery_before_deadline_keeps_counting() {
    runtime().block_on(async {
        let h = Harness::new();
        let stored = TimerState::running(Mode::Work, 1500, 1_500_000, 0, 0);
        h.records.save_timer_state(&stored).await.unwrap();
        h.clock.set(600_000);

        let recovered = recover_on_startup(&h.controller).await.unwrap();
        assert!(recovered.same_timer(&stored));
        assert_eq!(h.controller.remaining().await.unwrap(), 900);
        assert_eq!(h.wakes.pending_names().len(), 2);
    });
}

#[test]
fn recovery_of_expired_break_awaits_resume() {
    runtime().block_on(async {
        let h = Harness::new();
        h.open_tab(1, "https://example.com");
        h.controller.initialize().await.unwrap();
        h.run_work_to_deadline().await;
        let on_break = h.controller.check_expiry().await.unwrap();

        // Host sleeps through the end of the break.
        h.clock.set(on_break.timer_end_time + 3_600_000);
        let recovered = recover_on_startup(&h.controller).await.unwrap();

        assert_eq!(recovered.mode, Mode::Work);
        assert!(!recovered.is_running);
        assert_eq!(
            h.controller.phase().await.unwrap(),
            Phase::BreakEndedAwaitingResume
        );
    });
}

// For any deadline, session count and lateness, a late recovery commits the
// same single transition as an on-time one.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn late_recovery_matches_on_time(
        deadline in 1_000_000i64..4_000_000_000_000,
        sessions in 0u32..12,
        late_ms in 0i64..86_400_000,
        mode in prop_oneof![Just(Mode::Work), Just(Mode::Break)],
    ) {
        let stored = TimerState::running(mode, 300, deadline, sessions, deadline - 300_000);

        let (on_time, late) = runtime().block_on(async {
            (
                recover_at(&stored, deadline).await,
                recover_at(&stored, deadline + late_ms).await,
            )
        });

        prop_assert!(late.same_timer(&on_time));
        prop_assert_ne!(late.mode, mode);
        prop_assert_eq!(
            late.sessions_completed,
            if mode == Mode::Work { sessions + 1 } else { sessions }
        );
    }
}
