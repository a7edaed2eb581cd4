// src/main.rs

use exam_console::config::Config;
use exam_console::routes;
use exam_console::session::SessionStore;
use exam_console::state::AppState;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load configuration from environment (.env included)
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "console.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    for warning in &config.warnings {
        tracing::warn!("{}", warning);
    }

    tracing::info!("Backend: {} (realtime port {})", config.backend_url, config.realtime_port);

    // Re-hydrate operator sessions from the last run
    let sessions = SessionStore::open(&config.session_file)
        .await
        .expect("Failed to open session file");

    let state = AppState::new(config.clone(), sessions).expect("Failed to build backend client");

    // Probe the backend once; the console still starts if it is down
    match state.api.health().await {
        Ok(_) => tracing::info!("Backend reachable"),
        Err(e) => tracing::warn!("Backend not reachable yet: {}", e),
    }

    // Create the Axum application router
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("Failed to bind listen address");
    tracing::info!("Listening on {}", config.listen_addr);

    // Start the server
    axum::serve(listener, app).await.expect("Server error");
}
