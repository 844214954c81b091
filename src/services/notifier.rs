//! Notification presenter collaborator

use tracing::info;

/// One-way, fire-and-forget presentation of a message to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str);
}

/// Presents notifications through the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) {
        info!(target: "serene_focus::notification", "{} {}", title, body);
    }
}
