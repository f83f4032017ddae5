//! remix-engine - techno remix orchestration service
//!
//! Serves the remix session over HTTP + SSE on port 5750 by default. Track
//! analysis, match search and remix generation are delegated to three AI
//! functions, or to the offline demo backend with `--demo`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use remix_common::config::{default_config_path, TomlConfig};
use remix_common::events::EventBus;
use remix_engine::config::{BackendMode, CliOverrides, ServiceConfig, DEMO_LATENCY};
use remix_engine::services::Backend;
use remix_engine::{build_router, AppState, RemixEngine};

/// Events buffered per SSE subscriber
const EVENT_BUS_CAPACITY: usize = 256;

#[derive(Parser, Debug)]
#[command(name = "remix-engine")]
#[command(about = "Techno remix orchestration service")]
#[command(version)]
struct Args {
    /// TOML config file (defaults to <config_dir>/techno-remix/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the AI functions
    #[arg(long)]
    functions_url: Option<String>,

    /// API key for the AI functions
    #[arg(long)]
    api_key: Option<String>,

    /// Address to bind the HTTP server to
    #[arg(short, long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Use the offline demo backend instead of the AI functions
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let toml_config = TomlConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let default_filter = toml_config
        .logging
        .level
        .clone()
        .unwrap_or_else(|| "remix_engine=info,tower_http=info".to_string());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting remix-engine");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let overrides = CliOverrides {
        functions_url: args.functions_url,
        api_key: args.api_key,
        bind: args.bind,
        port: args.port,
        demo: args.demo,
    };
    let service_config =
        ServiceConfig::resolve(&overrides, &toml_config).context("Invalid configuration")?;

    let backend = match &service_config.backend {
        BackendMode::Remote(functions) => {
            info!(
                url = %functions.base_url,
                timeout_secs = functions.timeout.as_secs(),
                "Using AI functions backend"
            );
            Backend::remote(functions).context("Failed to create AI functions client")?
        }
        BackendMode::Demo => Backend::demo(DEMO_LATENCY),
    };

    let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
    let engine = RemixEngine::new(backend, event_bus, service_config.progress_interval);
    info!(
        progress_interval_ms = service_config.progress_interval.as_millis() as u64,
        "Remix engine initialized"
    );

    let app = build_router(AppState::new(engine));

    let addr = service_config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
