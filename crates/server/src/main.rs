//! mapcache server entry point.
//!
//! Loads configuration, runs the install and activate transitions, then
//! serves the cache engine as MCP tools on stdio. Logging goes to stderr to
//! avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use mapcache_client::{FetchClient, FetchConfig};
use mapcache_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod control;
mod engine;
mod handler;
mod lifecycle;
mod policy;
mod router;
mod subscribers;
#[cfg(test)]
mod testing;
mod tools;

use engine::CacheEngine;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(
        db = %config.db_path.display(),
        static_store = %config.static_store.name(),
        tile_store = %config.tile_store.name(),
        "starting mapcache"
    );

    let db = CacheDb::open(&config.db_path).await.context("opening cache database")?;
    let fetcher = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let engine = Arc::new(CacheEngine::new(&config, db, fetcher)?);

    engine.on_install().await.context("install")?;
    let deleted = engine.on_activate().await.context("activate")?;
    tracing::info!(phase = ?engine.phase(), deleted = deleted.len(), "activated");

    let (subscriber, mut notifications) = engine.subscribers().subscribe().await;
    tokio::spawn(async move {
        while let Some(notification) = notifications.recv().await {
            tracing::info!(?notification, "broadcast");
        }
    });

    let handler = handler::MapCacheServer::new(Arc::clone(&engine));
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    engine.subscribers().unsubscribe(subscriber).await;
    engine.settle_writes().await;
    if let Err(e) = engine.db().clone().close().await {
        tracing::warn!(error = %e, "closing cache database");
    }

    Ok(())
}
