//! HTTP API module
//!
//! The daemon's outer surface: observers send intents and read state here,
//! and the host bridge mirrors tabs and receives tab commands.

pub mod app_state;
pub mod handlers;
pub mod responses;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use app_state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/start", post(start_handler))
        .route("/pause", post(pause_handler))
        .route("/reset", post(reset_handler))
        .route("/check", post(check_handler))
        .route("/resume", post(resume_handler))
        .route("/break-ended", post(break_ended_handler))
        .route("/state", get(state_handler))
        .route("/settings", get(get_settings_handler).put(put_settings_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .route("/events", get(events_handler))
        .route("/tabs", get(list_tabs_handler).post(upsert_tab_handler))
        .route("/tabs/commands", get(tab_commands_handler))
        .route("/tabs/:tab_id/activated", post(tab_activated_handler))
        .route("/tabs/:tab_id", delete(remove_tab_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
