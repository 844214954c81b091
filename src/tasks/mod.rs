//! Tasks spawned next to the HTTP server
//!
//! Startup recovery and the suspension detector, the loop turning fired
//! wakes into expiry checks, and the optional `--watch` console observer.

pub mod console_watch;
pub mod wake_dispatch;
pub mod wake_up_recovery;

pub use console_watch::console_watch_task;
pub use wake_dispatch::wake_dispatch_task;
pub use wake_up_recovery::{recover_on_startup, wake_up_recovery_task};
