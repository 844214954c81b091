//! HTTP endpoint handlers

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

use super::{
    app_state::AppState,
    responses::{ApiResponse, HealthResponse, SettingsResponse, StatusResponse},
};
use crate::{
    observer::TimerView,
    protocol::{Intent, Reply},
    services::{Tab, TabId},
    state::{SettingsInput, TimerState},
};

type IntentResult = Result<(StatusCode, Json<ApiResponse>), StatusCode>;

async fn current_view(state: &AppState) -> Result<TimerView, StatusCode> {
    state.current_view().await.map_err(|e| {
        error!("Failed to read timer state: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

async fn view_of(state: &AppState, timer: &TimerState) -> Result<TimerView, StatusCode> {
    state.view_of(timer).await.map_err(|e| {
        error!("Failed to read tab snapshot: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Forward an intent and turn the optional reply into a response.
async fn run_intent(state: &AppState, action: &str, intent: Intent) -> IntentResult {
    state.record_action(action);

    match state.request(intent).await {
        Some(Reply::State { state: timer }) => {
            info!("{} applied", action);
            let view = view_of(state, &timer).await?;
            Ok((StatusCode::OK, Json(ApiResponse::ok(format!("{} applied", action), view))))
        }
        Some(Reply::Rejected { reason }) => {
            let view = current_view(state).await?;
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ApiResponse::rejected(reason, view)),
            ))
        }
        Some(Reply::Failed { error }) => {
            error!("{} failed: {}", action, error);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
        Some(Reply::Settings { .. }) | None => {
            debug!("{} queued without a state reply", action);
            let view = current_view(state).await?;
            Ok((
                StatusCode::ACCEPTED,
                Json(ApiResponse::accepted(format!("{} queued", action), view)),
            ))
        }
    }
}

/// Handle POST /start
pub async fn start_handler(State(state): State<Arc<AppState>>) -> IntentResult {
    run_intent(&state, "start", Intent::Start).await
}

/// Handle POST /pause
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> IntentResult {
    run_intent(&state, "pause", Intent::Pause).await
}

/// Handle POST /reset
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> IntentResult {
    run_intent(&state, "reset", Intent::Reset).await
}

/// Handle POST /check - run completion logic if the deadline passed
pub async fn check_handler(State(state): State<Arc<AppState>>) -> IntentResult {
    run_intent(&state, "check", Intent::CheckExpiry).await
}

/// Handle POST /resume - manual resume from the break view
pub async fn resume_handler(State(state): State<Arc<AppState>>) -> IntentResult {
    run_intent(&state, "resume", Intent::BreakEnded { manual_resume: true }).await
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakEndedBody {
    #[serde(default)]
    pub manual_resume: bool,
}

/// Handle POST /break-ended
pub async fn break_ended_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BreakEndedBody>,
) -> IntentResult {
    run_intent(
        &state,
        "break-ended",
        Intent::BreakEnded {
            manual_resume: body.manual_resume,
        },
    )
    .await
}

/// Handle GET /state - derived from the store, no controller round trip
pub async fn state_handler(State(state): State<Arc<AppState>>) -> Result<Json<TimerView>, StatusCode> {
    current_view(&state).await.map(Json)
}

/// Handle GET /settings
pub async fn get_settings_handler(State(state): State<Arc<AppState>>) -> Json<SettingsResponse> {
    Json(SettingsResponse {
        status: "ok".to_string(),
        message: None,
        settings: state.records.load_settings().await,
    })
}

/// Handle PUT /settings
pub async fn put_settings_handler(
    State(state): State<Arc<AppState>>,
    Json(input): Json<SettingsInput>,
) -> Result<(StatusCode, Json<SettingsResponse>), StatusCode> {
    state.record_action("save-settings");

    match state.request(Intent::SaveSettings { settings: input }).await {
        Some(Reply::Settings { settings }) => Ok((
            StatusCode::OK,
            Json(SettingsResponse {
                status: "ok".to_string(),
                message: None,
                settings,
            }),
        )),
        Some(Reply::Rejected { reason }) => {
            warn!("Settings rejected: {}", reason);
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(SettingsResponse {
                    status: "rejected".to_string(),
                    message: Some(reason),
                    settings: state.records.load_settings().await,
                }),
            ))
        }
        Some(Reply::Failed { error }) => {
            error!("Saving settings failed: {}", error);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
        Some(Reply::State { .. }) | None => Ok((
            StatusCode::ACCEPTED,
            Json(SettingsResponse {
                status: "accepted".to_string(),
                message: Some("settings queued".to_string()),
                settings: state.records.load_settings().await,
            }),
        )),
    }
}

/// Handle GET /status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, StatusCode> {
    let timer = current_view(&state).await?;
    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        timer,
        settings: state.records.load_settings().await,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Handle GET /tabs - the mirrored tab table
pub async fn list_tabs_handler(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Tab>>, StatusCode> {
    state.tabs.snapshot().map(Json).map_err(|e| {
        error!("Failed to read tab table: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Handle POST /tabs - host reports a tab opened or navigated
pub async fn upsert_tab_handler(
    State(state): State<Arc<AppState>>,
    Json(tab): Json<Tab>,
) -> StatusCode {
    let intent = Intent::TabNavigated {
        tab_id: tab.tab_id,
        url: tab.url.clone(),
    };
    if let Err(e) = state.tabs.upsert(tab) {
        error!("Failed to record tab: {}", e);
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    state.controller.send(intent);
    StatusCode::ACCEPTED
}

/// Handle POST /tabs/:tab_id/activated
pub async fn tab_activated_handler(
    State(state): State<Arc<AppState>>,
    Path(tab_id): Path<TabId>,
) -> StatusCode {
    if let Err(e) = state.tabs.mark_active(tab_id) {
        debug!("Activation for unmirrored tab {}: {}", tab_id, e);
        return StatusCode::NOT_FOUND;
    }
    state.controller.send(Intent::TabActivated { tab_id });
    StatusCode::ACCEPTED
}

/// Handle DELETE /tabs/:tab_id
pub async fn remove_tab_handler(
    State(state): State<Arc<AppState>>,
    Path(tab_id): Path<TabId>,
) -> StatusCode {
    match state.tabs.remove(tab_id) {
        Ok(true) => StatusCode::NO_CONTENT,
        Ok(false) => StatusCode::NOT_FOUND,
        Err(e) => {
            error!("Failed to remove tab {}: {}", tab_id, e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Turn a broadcast receiver into an SSE stream, skipping over lag.
fn sse_stream<T>(rx: broadcast::Receiver<T>) -> impl Stream<Item = Result<Event, Infallible>>
where
    T: Serialize + Clone + Send + 'static,
{
    stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    let event = Event::default()
                        .json_data(&message)
                        .unwrap_or_else(|e| Event::default().comment(format!("unencodable: {}", e)));
                    return Some((Ok(event), rx));
                }
                Err(RecvError::Lagged(missed)) => {
                    debug!("Event stream lagged by {} messages", missed);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

/// Handle GET /events - STATE_CHANGED and SETTINGS_CHANGED broadcasts
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(sse_stream(state.controller.subscribe())).keep_alive(KeepAlive::default())
}

/// Handle GET /tabs/commands - tab changes for the host bridge to apply
pub async fn tab_commands_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(sse_stream(state.tabs.subscribe_commands())).keep_alive(KeepAlive::default())
}
