//! Controller message loop and the handle observers talk through

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, error, info, warn};

use super::SessionController;
use crate::protocol::{Broadcast, Intent, Reply};

/// An intent plus an optional place to put the answer.
#[derive(Debug)]
pub struct Envelope {
    pub intent: Intent,
    pub reply: Option<oneshot::Sender<Reply>>,
}

/// Cloneable sender side of the controller's queue.
#[derive(Clone, Debug)]
pub struct ControllerHandle {
    tx: mpsc::Sender<Envelope>,
    events: broadcast::Sender<Broadcast>,
}

impl ControllerHandle {
    /// Fire and forget. Returns whether the intent was queued; a full or
    /// closed queue is logged and otherwise ignored.
    pub fn send(&self, intent: Intent) -> bool {
        let name = intent.name();
        match self.tx.try_send(Envelope { intent, reply: None }) {
            Ok(()) => true,
            Err(e) => {
                debug!("Dropped {} intent: {}", name, e);
                false
            }
        }
    }

    /// Send and wait up to `wait` for an answer. `None` means no answer
    /// arrived, which callers must tolerate.
    pub async fn request(&self, intent: Intent, wait: Duration) -> Option<Reply> {
        let name = intent.name();
        let (reply_tx, reply_rx) = oneshot::channel();
        let envelope = Envelope {
            intent,
            reply: Some(reply_tx),
        };

        let exchange = async {
            self.tx.send(envelope).await.ok()?;
            reply_rx.await.ok()
        };
        match timeout(wait, exchange).await {
            Ok(reply) => reply,
            Err(_) => {
                debug!("No reply to {} within {:?}", name, wait);
                None
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Broadcast> {
        self.events.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Start the controller's loop on its own task.
pub fn spawn(controller: Arc<SessionController>, capacity: usize) -> (ControllerHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = ControllerHandle {
        tx,
        events: controller.events(),
    };
    let task = tokio::spawn(run(controller, rx));
    (handle, task)
}

/// Process intents one at a time until every handle is dropped.
pub async fn run(controller: Arc<SessionController>, mut rx: mpsc::Receiver<Envelope>) {
    info!("Session controller started");

    while let Some(Envelope { intent, reply }) = rx.recv().await {
        let name = intent.name();
        debug!("Handling {} intent", name);

        let answer = match controller.handle(intent).await {
            Ok(answer) => answer,
            Err(e) if e.is_user_facing() => {
                warn!("Rejected {} intent: {}", name, e);
                Reply::Rejected {
                    reason: e.to_string(),
                }
            }
            Err(e) => {
                error!("Failed to handle {} intent: {}", name, e);
                Reply::Failed {
                    error: e.to_string(),
                }
            }
        };

        if let Some(reply) = reply {
            // The requester may have timed out and gone away.
            let _ = reply.send(answer);
        }
    }

    info!("Session controller stopped");
}
