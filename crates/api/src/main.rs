//! `rollcall-api` -- webhook receiver server.
//!
//! Accepts roster change events over HTTP and forwards them to the
//! persistence collaborator. When `ROSTER_FILE` is set, also runs the
//! file monitor in-process (producer and consumer sharing one process,
//! the reference deployment); the monitor's dispatcher then skips
//! deliveries to its own loopback address and changes flow to the sink
//! directly.
//!
//! # Environment variables
//!
//! See [`ReceiverConfig::from_env`] for the receiver table, plus:
//!
//! | Variable      | Required | Default                         | Description                      |
//! |---------------|----------|---------------------------------|----------------------------------|
//! | `ROSTER_FILE` | no       | unset (no in-process producer)  | Roster `.xlsx` to monitor        |
//! | `WEBHOOK_URL` | no       | `http://127.0.0.1:<port>/webhook` | Dispatcher destination         |

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rollcall_api::config::ReceiverConfig;
use rollcall_api::listener::SinkListener;
use rollcall_api::router::build_router;
use rollcall_api::state::AppState;
use rollcall_core::collab::{ChangeSink, OpenGate};
use rollcall_sync::{
    DispatcherConfig, FileMonitor, LogNotifier, LogSink, MonitorConfig, WebhookDispatcher,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rollcall_api=debug,rollcall_sync=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ReceiverConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        authentication = config.authentication_enabled(),
        hmac_validation = config.hmac_enabled(),
        "Loaded receiver configuration"
    );

    // --- Collaborators ---
    // The relational store lives in the wider application; this binary
    // wires the logging stand-in.
    let sink: Arc<dyn ChangeSink> = Arc::new(LogSink);

    // --- App state ---
    let listener = Arc::new(SinkListener::new(Arc::clone(&sink)));
    let state = AppState::new(config.clone(), listener);

    // --- Optional in-process producer ---
    let monitor = match std::env::var("ROSTER_FILE") {
        Ok(roster) => Some(start_monitor(&config, &roster, Arc::clone(&sink))),
        Err(_) => None,
    };

    // --- Router / server ---
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("HOST/PORT must form a valid socket address");

    let tcp = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind receiver address");
    tracing::info!(%addr, "Webhook receiver listening");

    axum::serve(tcp, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // Stop the producer before exiting so in-flight passes finish.
    if let Some(monitor) = monitor {
        monitor.stop().await;
    }
}

/// Build and start the in-process roster monitor.
///
/// Configuration errors here are fatal at startup; the component must not
/// enter a partially-configured running state.
fn start_monitor(config: &ReceiverConfig, roster: &str, sink: Arc<dyn ChangeSink>) -> FileMonitor {
    let webhook_url = std::env::var("WEBHOOK_URL")
        .unwrap_or_else(|_| format!("http://127.0.0.1:{}/webhook", config.port));

    let dispatcher = WebhookDispatcher::new(DispatcherConfig {
        url: webhook_url.clone(),
        api_key: config.api_key.clone().unwrap_or_default(),
        hmac_secret: config.hmac_secret.clone(),
    })
    .expect("Invalid webhook dispatcher configuration");

    let monitor = FileMonitor::new(
        MonitorConfig::new(roster),
        dispatcher,
        Arc::new(OpenGate),
        sink,
        Arc::new(LogNotifier),
    )
    .expect("Invalid roster monitor configuration");

    monitor.start().expect("Failed to start roster monitor");
    tracing::info!(roster = %roster, webhook = %webhook_url, "In-process roster monitor started");
    monitor
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
    tracing::info!("Shutdown signal received");
}
