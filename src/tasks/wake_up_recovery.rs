//! Startup recovery and host suspension detection

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::{
    clock::Clock,
    controller::{ControllerHandle, SessionController},
    error::Result,
    protocol::Intent,
    state::{derive_remaining, TimerState},
};

/// How often the suspension detector compares clocks.
pub const SUSPEND_CHECK_INTERVAL: Duration = Duration::from_secs(15);

/// Bring the controller back in line with the stored record after the
/// process (or the whole host) was down.
///
/// A running timer gets its wakes re-armed and is checked straight away,
/// so an interval that expired while nothing was running is completed now.
pub async fn recover_on_startup(controller: &SessionController) -> Result<TimerState> {
    let state = controller.initialize().await?;
    info!("Recovered {}", describe(&state, controller.now_ms()));
    if !state.is_running {
        return Ok(state);
    }

    controller.rearm_wakes(&state);
    controller.check_expiry().await
}

/// Background task that notices the host was suspended and asks the
/// controller to re-check the deadline.
///
/// A suspended host stops the monotonic clock but not the wall clock, so a
/// wall-clock jump well beyond the tick period means we just woke up.
pub async fn wake_up_recovery_task(clock: Arc<dyn Clock>, controller: ControllerHandle) {
    info!("Starting wake-up recovery task");

    let mut ticker = interval(SUSPEND_CHECK_INTERVAL);
    let mut last_wall = clock.now_ms();
    let mut last_mono = Instant::now();

    loop {
        ticker.tick().await;
        if controller.is_closed() {
            break;
        }

        let wall = clock.now_ms();
        let mono = Instant::now();
        let wall_elapsed = wall - last_wall;
        let mono_elapsed = mono.duration_since(last_mono).as_millis() as i64;
        last_wall = wall;
        last_mono = mono;

        if wall_elapsed - mono_elapsed > 2 * SUSPEND_CHECK_INTERVAL.as_millis() as i64 {
            info!(
                "Host wake-up detected after ~{}s away, re-checking timer",
                (wall_elapsed - mono_elapsed) / 1000
            );
            if !controller.send(Intent::CheckExpiry) {
                warn!("Failed to queue wake-up check");
            }
        } else {
            debug!("No suspension since last check");
        }
    }

    info!("Wake-up recovery task stopped");
}

/// One-line summary of a record for the log.
pub fn describe(state: &TimerState, now_ms: i64) -> String {
    if state.is_running {
        format!("{} running, {}s left", state.mode.as_str(), derive_remaining(state, now_ms))
    } else {
        format!("{} idle, {}s left", state.mode.as_str(), state.time_left)
    }
}
