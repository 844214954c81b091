//! External collaborator module
//!
//! Traits for the capabilities the session controller consumes from its
//! host (tabs, scheduled wakes, notifications) and the implementations the
//! daemon ships with.

pub mod notifier;
pub mod tabs;
pub mod wake;

pub use notifier::{LogNotifier, Notifier};
pub use tabs::{InMemoryTabs, Tab, TabId, TabManager};
pub use wake::{TokioWakeScheduler, WakeScheduler, WakeSpec, DEADLINE_WAKE, TICK_WAKE};
