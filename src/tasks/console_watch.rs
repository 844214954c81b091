//! Console observer attached with `--watch`

use std::{sync::Arc, time::Duration};

use tracing::{info, warn};

use crate::{
    clock::Clock,
    controller::ControllerHandle,
    observer::{Observer, ObserverKind},
    store::Records,
};

/// Render the countdown into the log, one line per change of minute or phase.
pub async fn console_watch_task(records: Records, controller: ControllerHandle, clock: Arc<dyn Clock>) {
    let observer = match Observer::attach(ObserverKind::Popup, records, controller, clock).await {
        Ok(observer) => observer,
        Err(e) => {
            warn!("Console observer could not attach: {}", e);
            return;
        }
    };

    let mut last_line = String::new();
    observer
        .run(Duration::from_secs(1), move |view| {
            let line = format!(
                "{:?} {} ({} sessions)",
                view.phase,
                if view.is_running { &view.badge } else { &view.clock },
                view.sessions_completed
            );
            if line != last_line {
                info!(target: "serene_focus::watch", "{}", line);
                last_line = line;
            }
        })
        .await;
}
