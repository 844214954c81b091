//! Serene Focus - a work/break interval scheduler with break enforcement
//!
//! This library provides the timer state machine, its persisted records,
//! the message protocol between the session controller and its observers,
//! and the HTTP surface the daemon exposes.

pub mod api;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod observer;
pub mod protocol;
pub mod services;
pub mod state;
pub mod store;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::{create_router, AppState};
pub use config::{Config, ControllerConfig};
pub use controller::{ControllerHandle, SessionController};
pub use error::{FocusError, Result};
pub use utils::signals::shutdown_signal;
