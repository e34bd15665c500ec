//! `rollcall-sync` -- standalone roster watcher.
//!
//! Watches a roster spreadsheet and pushes change events to a remote
//! webhook receiver. Use this when the producer runs on a different host
//! than the receiver; the `rollcall-api` server embeds the same monitor
//! in-process instead.
//!
//! # Environment variables
//!
//! | Variable              | Required | Default | Description                           |
//! |-----------------------|----------|---------|---------------------------------------|
//! | `ROSTER_FILE`         | yes      | --      | Path to the roster `.xlsx` file       |
//! | `WEBHOOK_URL`         | yes      | --      | Receiver endpoint, e.g. `http://host:8081/webhook` |
//! | `WEBHOOK_API_KEY`     | no       | empty   | Sent as `X-API-Key`                   |
//! | `WEBHOOK_HMAC_SECRET` | no       | unset   | Enables `X-Hub-Signature-256` signing |
//! | `POLL_INTERVAL_SECS`  | no       | `5`     | Seconds between polls                 |

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rollcall_core::collab::OpenGate;
use rollcall_sync::{
    DispatcherConfig, FileMonitor, LogNotifier, LogSink, MonitorConfig, WebhookDispatcher,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rollcall_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let roster_file = std::env::var("ROSTER_FILE").unwrap_or_else(|_| {
        tracing::error!("ROSTER_FILE environment variable is required");
        std::process::exit(1);
    });

    let webhook_url = std::env::var("WEBHOOK_URL").unwrap_or_else(|_| {
        tracing::error!("WEBHOOK_URL environment variable is required");
        std::process::exit(1);
    });

    let poll_secs: u64 = std::env::var("POLL_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5);

    let dispatcher = WebhookDispatcher::new(DispatcherConfig {
        url: webhook_url.clone(),
        api_key: std::env::var("WEBHOOK_API_KEY").unwrap_or_default(),
        hmac_secret: std::env::var("WEBHOOK_HMAC_SECRET").ok(),
    })
    .unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid webhook configuration");
        std::process::exit(1);
    });

    let mut config = MonitorConfig::new(&roster_file);
    config.poll_interval = Duration::from_secs(poll_secs);

    let monitor = FileMonitor::new(
        config,
        dispatcher,
        Arc::new(OpenGate),
        Arc::new(LogSink),
        Arc::new(LogNotifier),
    )
    .unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid roster configuration");
        std::process::exit(1);
    });

    tracing::info!(
        roster = %roster_file,
        webhook = %webhook_url,
        poll_secs,
        "Starting rollcall-sync",
    );

    if let Err(e) = monitor.start() {
        tracing::error!(error = %e, "Failed to start roster monitor");
        std::process::exit(1);
    }

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");

    tracing::info!("Shutdown signal received");
    monitor.stop().await;
}
