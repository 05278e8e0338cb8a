//! Run the HTTP server.

use folio_core::config::StorageBackend;
use folio_core::Config;
use folio_server::{create_router, AppState};
use folio_storage::{JsonStore, MemoryStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Command-line overrides for `folio serve`.
#[derive(Debug, Default)]
pub struct ServeOptions {
    pub address: Option<String>,
    pub memory: bool,
    pub data_dir: Option<PathBuf>,
}

/// Build the server state for the selected storage backend.
pub fn build_state(config: Config, options: &ServeOptions) -> anyhow::Result<AppState> {
    let backend = if options.memory {
        StorageBackend::Memory
    } else {
        config.storage_backend()
    };

    let state = match backend {
        StorageBackend::Memory => {
            info!("Using in-memory storage");
            AppState::from_repos(Arc::new(MemoryStore::new()), config)?
        }
        StorageBackend::Json => {
            let path = options
                .data_dir
                .clone()
                .unwrap_or_else(|| config.storage_path());
            info!(path = %path.display(), "Using JSON file storage");
            AppState::from_repos(Arc::new(JsonStore::new(path)), config)?
        }
    };
    Ok(state)
}

/// Serve until Ctrl-C.
pub async fn run_server(config: Config, options: ServeOptions) -> anyhow::Result<()> {
    let address = options
        .address
        .clone()
        .unwrap_or_else(|| config.address());
    if config.dev_mode() {
        tracing::warn!("Running in development mode");
    }
    let state = build_state(config, &options)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(address = %listener.local_addr()?, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
