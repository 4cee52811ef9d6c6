mod config;
mod documents;
mod errors;
mod llm_client;
mod processing;
mod resume;
mod routes;
mod state;
mod storage;
mod webhook;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Notify;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, StorageBackend};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{ArtifactStore, LocalStore, S3Store};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Gemini client
    let llm = LlmClient::new(
        config.gemini_api_key.clone(),
        &config.gemini_api_base,
        &config.gemini_model,
    )?;
    info!("LLM client initialized ({})", llm.endpoint());

    // Initialize artifact storage
    let store = build_store(&config).await;

    if config.webhook_url.is_none() {
        warn!("WEBHOOK_URL not set; results will not be forwarded");
    }

    let grace = Duration::from_secs(config.shutdown_grace_secs);
    let port = config.port;
    let state = AppState::new(config, Arc::new(llm), store)?;

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let stopping = Arc::new(Notify::new());
    let signal = {
        let stopping = stopping.clone();
        async move {
            shutdown_signal().await;
            info!("Shutdown signal received; draining in-flight requests");
            stopping.notify_one();
        }
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .into_future();
    tokio::select! {
        result = server => result?,
        _ = async {
            stopping.notified().await;
            tokio::time::sleep(grace).await;
        } => warn!("Grace period of {}s elapsed; exiting with requests in flight", grace.as_secs()),
    }

    info!("Server stopped");
    Ok(())
}

/// Picks the artifact store named by `STORAGE_BACKEND`.
async fn build_store(config: &Config) -> Arc<dyn ArtifactStore> {
    match &config.storage {
        StorageBackend::Local => {
            info!("Storing artifacts under {}", config.upload_dir.display());
            Arc::new(LocalStore::new(
                config.upload_dir.clone(),
                &config.public_base_url,
            ))
        }
        StorageBackend::S3 {
            bucket,
            endpoint,
            region,
        } => {
            info!("Storing artifacts in S3 bucket {bucket}");
            Arc::new(S3Store::connect(bucket.clone(), endpoint.clone(), region.clone()).await)
        }
    }
}

/// Resolves on Ctrl-C, or on SIGTERM where available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
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
