// src/main.rs

use std::sync::Arc;

use assessment_engine::clients::{
    Collaborators,
    http::{HttpContentRepository, HttpLedgerService, HttpResultStore},
};
use assessment_engine::config::Config;
use assessment_engine::engine::timer::SystemClock;
use assessment_engine::registry::{SWEEP_INTERVAL, SessionRegistry};
use assessment_engine::routes;
use assessment_engine::state::AppState;
use dotenvy::dotenv;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env()?;

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
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

    // One HTTP client shared by all collaborators. No request timeout: the
    // test timer is the only deadline.
    let client = reqwest::Client::new();
    let collaborators = Collaborators {
        content: Arc::new(HttpContentRepository::new(
            client.clone(),
            config.content_api_url.clone(),
        )),
        ledger: Arc::new(HttpLedgerService::new(
            client.clone(),
            config.ledger_api_url.clone(),
        )),
        results: Arc::new(HttpResultStore::new(client, config.results_api_url.clone())),
    };

    tracing::info!(
        content = %config.content_api_url,
        ledger = %config.ledger_api_url,
        results = %config.results_api_url,
        policy = ?config.fullscreen_policy,
        "Collaborators configured"
    );

    // Finished sessions are dropped once their retention window has passed
    let sessions = SessionRegistry::new();
    sessions.spawn_sweeper(SWEEP_INTERVAL, config.session_retention);

    // Create AppState
    let addr = config.bind_addr;
    let state = AppState {
        config,
        collaborators,
        clock: Arc::new(SystemClock),
        sessions,
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start the server
    axum::serve(listener, app).await?;
    Ok(())
}
