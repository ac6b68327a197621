//! PDF tools server
//!
//! Accepts multipart uploads on `POST /api/pdf/process` and answers with the
//! processed document, or a zip of pages for split:
//!
//! - merge, split, extract, rotate, crop and delete via lopdf
//! - word-to-pdf via a headless LibreOffice
//!
//! The server holds no state between requests. Uploads live in memory for
//! the duration of a single request.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pdftools_core::{Dispatcher, LibreOfficeConverter, UploadPolicy};

mod api;
mod config;
mod error;

use config::{Args, ServerConfig};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub policy: Arc<UploadPolicy>,
    pub dispatcher: Dispatcher,
    /// Where result copies are written, if anywhere
    pub debug_dump_dir: Option<Arc<PathBuf>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_args(&args)?;

    let state = AppState {
        policy: Arc::new(config.policy.clone()),
        dispatcher: Dispatcher::new(Arc::new(LibreOfficeConverter::new(config.soffice.clone()))),
        debug_dump_dir: config.debug_dump_dir.clone().map(Arc::new),
    };

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api::router(state, config.static_dir.as_deref())
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;

    info!("Server listening on http://{}", config.addr);
    info!(
        "Upload limits: {} files, {} bytes per file",
        config.policy.max_files, config.policy.max_file_size
    );
    info!("Office converter: {}", config.soffice.display());
    if let Some(dir) = &config.static_dir {
        info!("Serving frontend from {}", dir.display());
    }
    if let Some(dir) = &config.debug_dump_dir {
        info!("Writing result copies to {}", dir.display());
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
