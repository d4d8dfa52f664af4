use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use convertino_core::{
    load_config, load_config_or_default, validate_config, ConversionOrchestrator, Converter,
    FfmpegConverter, RetentionSweeper, TempStore,
};
use convertino_server::{api::create_router, metrics::OUTPUTS_SWEPT_TOTAL, state::AppState};

/// Environment variable naming the config file.
const CONFIG_ENV: &str = "CONVERTINO_CONFIG";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // An explicit path must exist; the default one is optional
    let config = match std::env::var(CONFIG_ENV) {
        Ok(path) => {
            let path = PathBuf::from(path);
            info!("Loading configuration from {:?}", path);
            load_config(&path)
                .with_context(|| format!("Failed to load config from {:?}", path))?
        }
        Err(_) => {
            let path = PathBuf::from("config.toml");
            info!("Loading configuration from {:?} (defaults if absent)", path);
            load_config_or_default(&path).context("Failed to load configuration")?
        }
    };

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Upload directory: {:?}", config.storage.upload_dir);
    info!("Max upload size: {} bytes", config.storage.max_upload_bytes);

    // The converter is useless without ffmpeg, so refuse to start
    let converter = FfmpegConverter::new(config.converter.clone());
    converter
        .validate()
        .await
        .context("FFmpeg is not usable")?;

    let store = TempStore::open(&config.storage.upload_dir)
        .await
        .context("Failed to prepare upload directory")?;
    // Nothing is converting yet, so any upload or partial output is a leftover.
    store.purge_scratch().await;

    let orchestrator = Arc::new(ConversionOrchestrator::new(
        store.clone(),
        Arc::new(converter),
    ));

    // Retention sweeper
    let shutdown = CancellationToken::new();
    let sweeper_handle = match config.retention.output_ttl() {
        Some(ttl) => {
            let sweeper = RetentionSweeper::new(store, ttl, config.retention.sweep_interval())
                .with_callback(Arc::new(|removed: usize| {
                    OUTPUTS_SWEPT_TOTAL.inc_by(removed as u64)
                }));
            Some(sweeper.spawn(shutdown.clone()))
        }
        None => {
            warn!("Output retention disabled, converted files are kept until removed manually");
            None
        }
    };

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), Arc::clone(&orchestrator)));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");

    // Nothing should outlive the server
    let in_flight = orchestrator.registry().active_count();
    if in_flight > 0 {
        warn!("{} conversions still registered at shutdown", in_flight);
    }

    shutdown.cancel();
    if let Some(handle) = sweeper_handle {
        let _ = handle.await;
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
