//! # Portal API Entry Point
//!
//! Wires the durable registration store, the chain-state reconciler and
//! the HTTP router together.
//!
//! ## Configuration
//!
//! ```
//! portal-api [config.toml]
//! ```
//!
//! With no argument the built-in defaults are used. Environment
//! overrides on top of the file:
//! - `PORTAL_BIND` — HTTP bind address
//! - `PORTAL_DB_PATH` — registration database directory
//!
//! The chain data source here is the in-process mock; a deployment
//! wires a real RPC-backed [`ChainSource`] in its place.

use std::env;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Notify;
use tracing::{error, info, Level};

use portal_api::{router, AppState};
use portal_common::config::{self, Config};
use portal_indexer::{ChainSource, MockChainSource, Reconciler, ReconcilerRunner, SharedIndex};
use portal_store::SledStore;

fn load_config() -> anyhow::Result<Config> {
    let mut cfg = match env::args().nth(1) {
        Some(path) => config::load_from_file(&path)
            .map_err(|e| anyhow::anyhow!("failed to load {path}: {e}"))?,
        None => Config::default(),
    };
    if let Ok(bind) = env::var("PORTAL_BIND") {
        cfg.bind_addr = bind;
    }
    if let Ok(db_path) = env::var("PORTAL_DB_PATH") {
        cfg.db_path = db_path;
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let cfg = load_config()?;

    info!("═══════════════════════════════════════════════════════════════");
    info!("                     Staking Portal API                         ");
    info!("═══════════════════════════════════════════════════════════════");
    info!("Bind:      {}", cfg.bind_addr);
    info!("DB path:   {}", cfg.db_path);
    info!("Network:   {}", cfg.network);
    info!("Token:     {}", cfg.token);
    info!("═══════════════════════════════════════════════════════════════");

    let store = Arc::new(SledStore::open(&cfg.db_path).context("opening registration database")?);

    let source: Arc<dyn ChainSource> = Arc::new(MockChainSource::new());
    let index = Arc::new(SharedIndex::new());
    let reconciler = Arc::new(Reconciler::new(source, store.clone(), index.clone()));

    let shutdown = Arc::new(Notify::new());
    let cycle_handles =
        ReconcilerRunner::new(reconciler, cfg.intervals, shutdown.clone()).start();

    let bind_addr = cfg.bind_addr.clone();
    let state = AppState::new(cfg, store, index);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr.as_str())
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    info!("listening on http://{bind_addr}");

    let server = axum::serve(listener, app).with_graceful_shutdown({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to listen for Ctrl+C: {e}");
            }
            info!("shutdown requested");
            shutdown.notify_waiters();
        }
    });
    server.await.context("http server failed")?;

    for handle in cycle_handles {
        let _ = handle.await;
    }
    info!("portal stopped cleanly");
    Ok(())
}
