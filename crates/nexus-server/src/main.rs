//! Nexus Bridge - local HTTP bridge for chat, image generation, and
//! small web utilities.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod error;
mod state;

use nexus_core::backend::{UnavailableImageBackend, UnavailableTextBackend};
use nexus_core::{BridgeConfig, ChatRouter, ImageJobRunner, ModelSession};
use state::AppState;

/// Nexus local bridge / BYOM manager.
#[derive(Parser, Debug)]
#[command(name = "nexus-bridge", version, about)]
struct Args {
    /// Directory containing GGUF text models
    #[arg(long = "dir", env = "NEXUS_MODELS_DIR")]
    models_dir: Option<PathBuf>,

    /// Directory containing image models
    #[arg(long = "img-dir", env = "NEXUS_IMAGES_DIR")]
    images_dir: Option<PathBuf>,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "NEXUS_HOST")]
    host: String,

    /// Port to run the server on
    #[arg(long, default_value = "5484", env = "NEXUS_PORT")]
    port: u16,

    /// Context size for loaded text models
    #[arg(long = "ctx", default_value = "4096", env = "NEXUS_CTX")]
    context_size: u32,

    /// Directory with the bundled UI
    #[arg(long, default_value = "ui", env = "NEXUS_UI_DIR")]
    ui_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nexus_server=debug,nexus_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = BridgeConfig::default();
    if let Some(dir) = args.models_dir {
        config.models_dir = dir;
    }
    if let Some(dir) = args.images_dir {
        config.images_dir = dir;
    }
    config.context_size = args.context_size;
    config.ensure_dirs();
    info!("model directory: {}", config.models_dir.display());
    info!("image directory: {}", config.images_dir.display());

    // Backend selection happens here, once: builds without native bindings
    // get the unavailable implementations and stay proxy-only.
    let session = Arc::new(ModelSession::new(
        config.clone(),
        Arc::new(UnavailableTextBackend),
        Arc::new(UnavailableImageBackend),
    ));
    let router = Arc::new(ChatRouter::new(session.clone()));
    let images = Arc::new(ImageJobRunner::new(session.clone()));
    let state = AppState::new(config, session, router, images);

    let app = api::create_router(state, &args.ui_dir);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Nexus Bridge listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("received SIGTERM, shutting down");
        },
    }
}
