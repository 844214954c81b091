//! Scheduled-wake collaborator

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::{sync::mpsc, task::AbortHandle, time::sleep};
use tracing::{debug, warn};

use crate::clock::Clock;

/// Recurring check while a timer runs.
pub const TICK_WAKE: &str = "pomodoroTimer";
/// One-shot wake exactly at the deadline.
pub const DEADLINE_WAKE: &str = "pomodoroDeadline";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeSpec {
    Once { at_ms: i64 },
    Recurring { first_at_ms: i64, period: Duration },
}

/// Only the controller schedules or cancels wakes. Both calls take effect
/// before they return.
pub trait WakeScheduler: Send + Sync {
    /// Schedule `name`, replacing any pending wake with the same name.
    fn schedule(&self, name: &str, spec: WakeSpec);

    fn cancel(&self, name: &str);
}

/// Wakes backed by tokio tasks. Fired wake names arrive on the receiver
/// returned from `new`.
pub struct TokioWakeScheduler {
    clock: Arc<dyn Clock>,
    pending: Mutex<HashMap<String, AbortHandle>>,
    fired_tx: mpsc::UnboundedSender<String>,
}

impl TokioWakeScheduler {
    pub fn new(clock: Arc<dyn Clock>) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        (
            Self {
                clock,
                pending: Mutex::new(HashMap::new()),
                fired_tx,
            },
            fired_rx,
        )
    }

    fn delay_until(&self, at_ms: i64) -> Duration {
        Duration::from_millis(at_ms.saturating_sub(self.clock.now_ms()).max(0) as u64)
    }

    pub fn pending_names(&self) -> Vec<String> {
        self.pending
            .lock()
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl WakeScheduler for TokioWakeScheduler {
    fn schedule(&self, name: &str, spec: WakeSpec) {
        let tx = self.fired_tx.clone();
        let wake_name = name.to_string();

        let handle = match spec {
            WakeSpec::Once { at_ms } => {
                let delay = self.delay_until(at_ms);
                tokio::spawn(async move {
                    sleep(delay).await;
                    debug!("Wake {} fired", wake_name);
                    let _ = tx.send(wake_name);
                })
            }
            WakeSpec::Recurring { first_at_ms, period } => {
                let delay = self.delay_until(first_at_ms);
                tokio::spawn(async move {
                    sleep(delay).await;
                    loop {
                        debug!("Wake {} fired", wake_name);
                        if tx.send(wake_name.clone()).is_err() {
                            break;
                        }
                        sleep(period).await;
                    }
                })
            }
        };

        match self.pending.lock() {
            Ok(mut pending) => {
                if let Some(previous) = pending.insert(name.to_string(), handle.abort_handle()) {
                    previous.abort();
                }
            }
            Err(e) => {
                warn!("Wake table poisoned, dropping wake {}: {}", name, e);
                handle.abort();
            }
        }
    }

    fn cancel(&self, name: &str) {
        match self.pending.lock() {
            Ok(mut pending) => {
                if let Some(handle) = pending.remove(name) {
                    handle.abort();
                    debug!("Wake {} cancelled", name);
                }
            }
            Err(e) => warn!("Wake table poisoned, cannot cancel {}: {}", name, e),
        }
    }
}

impl Drop for TokioWakeScheduler {
    fn drop(&mut self) {
        if let Ok(pending) = self.pending.lock() {
            for handle in pending.values() {
                handle.abort();
            }
        }
    }
}
