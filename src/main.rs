//! Serene Focus daemon
//!
//! Hosts the session controller and serves observers over HTTP.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use serene_focus::{
    api::{create_router, AppState},
    clock::{Clock, SystemClock},
    config::Config,
    controller::{actor, SessionController},
    services::{InMemoryTabs, LogNotifier, TokioWakeScheduler},
    store::{FileStore, Records},
    tasks::{console_watch_task, recover_on_startup, wake_dispatch_task, wake_up_recovery_task},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("serene_focus={},tower_http=info", config.log_level()))
        .init();

    info!("Starting serene-focus v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, state_file={}, wake_interval={}s",
        config.host,
        config.port,
        config.state_file.display(),
        config.wake_interval
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let records = Records::new(Arc::new(FileStore::open(&config.state_file).await?));
    let tabs = Arc::new(InMemoryTabs::new());
    let (wakes, fired) = TokioWakeScheduler::new(Arc::clone(&clock));

    let controller = Arc::new(SessionController::new(
        records.clone(),
        tabs.clone(),
        Arc::new(wakes),
        Arc::new(LogNotifier),
        Arc::clone(&clock),
        config.controller_config(),
    ));

    // Commit anything that expired while we were not running
    let recovered = recover_on_startup(&controller).await?;
    info!(
        "Timer recovered: mode={}, running={}, sessions={}",
        recovered.mode.as_str(),
        recovered.is_running,
        recovered.sessions_completed
    );

    let (handle, controller_task) = actor::spawn(Arc::clone(&controller), 64);

    tokio::spawn(wake_dispatch_task(fired, handle.clone()));
    tokio::spawn(wake_up_recovery_task(Arc::clone(&clock), handle.clone()));
    if config.watch {
        tokio::spawn(console_watch_task(records.clone(), handle.clone(), Arc::clone(&clock)));
    }

    let state = Arc::new(AppState::new(
        handle,
        records,
        tabs,
        clock,
        config.reply_timeout(),
        config.port,
        config.host.clone(),
    ));
    let app = create_router(state);

    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /start, /pause, /reset, /check  - Timer intents");
    info!("  POST /resume, /break-ended           - Leave a break");
    info!("  GET  /state, /status, /health        - Current state");
    info!("  GET|PUT /settings                    - Interval durations");
    info!("  GET  /events                         - Broadcast stream");
    info!("  GET|POST /tabs, GET /tabs/commands   - Host tab bridge");

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    controller_task.abort();
    info!("Server shutdown complete");
    Ok(())
}
