//! Claims Adjudication - API Server Binary
//!
//! Starts the HTTP API that turns claim documents into decisions.
//!
//! # Usage
//!
//! ```bash
//! # Run on local rules only
//! CLAIMS_DECLARATIONS_DIR=data/declarations cargo run --bin insurance-claims-api
//!
//! # With a reasoning collaborator
//! CLAIMS_REASONING__BASE_URL=https://llm.example.com \
//! CLAIMS_REASONING__API_KEY=... cargo run --bin insurance-claims-api
//! ```
//!
//! # Environment Variables
//!
//! * `CLAIMS_HOST` - Server host (default: 0.0.0.0)
//! * `CLAIMS_PORT` - Server port (default: 8080)
//! * `CLAIMS_LOG_LEVEL` - Log level, overridden by `RUST_LOG` (default: info)
//! * `CLAIMS_LOG_JSON` - Emit JSON log lines (default: false)
//! * `CLAIMS_DECLARATIONS_DIR` - Declarations documents (default: data/declarations)
//! * `CLAIMS_REQUEST_TIMEOUT_MS` - Per-decision deadline (default: 60000)
//! * `CLAIMS_REASONING__BASE_URL`, `__API_KEY`, `__MODEL`, `__TIMEOUT_MS`
//! * `CLAIMS_RETRIEVAL__BASE_URL`, `__API_KEY`, `__TOP_K`, `__TIMEOUT_MS`
//! * `CLAIMS_PIPELINE__*` - Pipeline thresholds, e.g. `FRAUD_REVIEW_THRESHOLD`

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use interface_api::{build_pipeline, config::AppConfig, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("invalid CLAIMS_ configuration")?;

    init_tracing(&config.log_level, config.log_json);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        declarations_dir = %config.declarations_dir.display(),
        "Starting claims adjudication API server"
    );

    let pipeline = build_pipeline(&config)?;
    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("invalid server address {}", config.server_addr()))?;

    let app = create_router(pipeline, config);

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber; `RUST_LOG` wins over `log_level`
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Waits for Ctrl+C or SIGTERM so in-flight decisions can finish
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
