//! Wake dispatch background task

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{controller::ControllerHandle, protocol::Intent};

/// Forward every fired wake to the controller as an expiry check.
///
/// The controller decides from the stored deadline whether anything is due,
/// so duplicate or stale wakes are harmless here.
pub async fn wake_dispatch_task(mut fired: mpsc::UnboundedReceiver<String>, controller: ControllerHandle) {
    info!("Starting wake dispatch task");

    while let Some(name) = fired.recv().await {
        debug!("Dispatching wake {}", name);
        if !controller.send(Intent::CheckExpiry) {
            if controller.is_closed() {
                warn!("Controller gone, stopping wake dispatch");
                break;
            }
            warn!("Controller queue full, dropped wake {}", name);
        }
    }

    info!("Wake dispatch task stopped");
}
