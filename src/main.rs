//! Focus Timer - A persistent pomodoro countdown service for a browser start page
//!
//! This is the main entry point for the focus-timer application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use focus_timer::{
    config::Config,
    state::AppState,
    api::create_router,
    tasks::{ticker_task, wake_up_recovery_task},
    timer::{FileStore, SystemClock, TimerEngine},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("focus_timer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting focus-timer server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, tick={}ms",
          config.host, config.port, config.tick_interval().as_millis());

    // Create the engine over the persisted store and restore any countdown
    let store = FileStore::open(&config.store);
    info!("Timer store: {}", store.path().display());
    let engine = TimerEngine::new(Box::new(store), Arc::new(SystemClock));
    let state = Arc::new(AppState::new(config.port, config.host.clone(), engine, config.alarm()));
    state.restore().map_err(anyhow::Error::msg)?;

    // Start the countdown ticker background task
    let ticker_state = Arc::clone(&state);
    let tick_interval = config.tick_interval();
    tokio::spawn(async move {
        ticker_task(ticker_state, tick_interval).await;
    });

    // Reconcile after the machine wakes from sleep
    let wake_state = Arc::clone(&state);
    let wake_interval = config.wake_check_interval();
    tokio::spawn(async move {
        wake_up_recovery_task(wake_state, wake_interval).await;
    });

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /timer           - Current countdown");
    info!("  POST /timer/start     - Start or resume");
    info!("  POST /timer/pause     - Pause");
    info!("  POST /timer/toggle    - Start/pause");
    info!("  POST /timer/reset     - Reset to a full session");
    info!("  PUT  /timer/duration  - Set session length {{\"minutes\": n}}");
    info!("  POST /timer/reconcile - Re-read persisted state");
    info!("  GET  /status          - Countdown and server status");
    info!("  GET  /health          - Health check");

    // Setup graceful shutdown
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

    info!("Server shutdown complete");
    Ok(())
}
