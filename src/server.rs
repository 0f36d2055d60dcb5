//! HTTP server bootstrap.
//!
//! [`build_state`] opens the snapshot store and the auth token; [`serve_http`] binds the
//! loopback listener and runs the router until ctrl-c.

use anyhow::{Context, Result};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use crate::api::{self, AppState};
use crate::auth::AuthToken;
use crate::config::MemhostConfig;
use crate::memory::profile::RegexProfileExtractor;
use crate::memory::store::MemoryStore;

/// Open the store and token described by `config` and bundle them for the router.
pub fn build_state(config: MemhostConfig) -> Result<AppState> {
    let snapshot_path = config.snapshot_path();
    let store = MemoryStore::open(&snapshot_path, config.limits.clone())
        .with_context(|| format!("failed to open store at {}", snapshot_path.display()))?;
    tracing::info!(
        path = %snapshot_path.display(),
        memories = store.active_count(),
        "store ready"
    );

    let token = AuthToken::load_or_create(&config.token_path())?;
    let extractor = Arc::new(RegexProfileExtractor::new(
        config.retrieval.profile_max_facts,
    ));

    Ok(AppState::new(store, token, config, extractor))
}

/// Serve the HTTP API on `127.0.0.1:<port>`.
pub async fn serve_http(config: MemhostConfig) -> Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, config.server.port));
    let token_path = config.token_path();

    let state = build_state(config)?;
    let router = api::router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(
        addr = %addr,
        token_file = %token_path.display(),
        "memhost listening at http://{addr}"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
