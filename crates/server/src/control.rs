//! Bulk control channel: pre-warm and clear the tile store out-of-band.
//!
//! Inbound commands and outbound notifications use the JSON shapes
//!
//! ```json
//! { "type": "CACHE_TILES", "tiles": ["https://...", "..."] }
//! { "type": "CLEAR_CACHE" }
//! { "type": "CACHE_COMPLETE", "count": 5 }
//! { "type": "CACHE_CLEARED" }
//! ```
//!
//! `CACHE_COMPLETE.count` is the number of URLs submitted, not the number
//! cached. The local [`WarmReport`] carries both.

use crate::subscribers::SubscriberRegistry;
use mapcache_client::Fetcher;
use mapcache_core::{CacheDb, Error, RequestIdentity, ResourceRequest};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    CacheTiles { tiles: Vec<String> },
    ClearCache,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    CacheComplete { count: usize },
    CacheCleared,
}

/// Outcome of one warm batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WarmReport {
    /// URLs submitted; this is what `CACHE_COMPLETE` reports.
    pub requested: usize,
    /// URLs fetched with a 2xx status and written to the tile store.
    pub succeeded: usize,
    /// URLs that failed to fetch, returned a non-2xx status, or failed to store.
    pub failed: usize,
}

/// Result of a dispatched command, as returned to the local caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CommandOutcome {
    pub notification: Notification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<WarmReport>,
}

pub struct ControlChannel {
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    tile_store: String,
    subscribers: SubscriberRegistry,
    concurrency: usize,
}

impl ControlChannel {
    pub fn new(
        db: CacheDb, fetcher: Arc<dyn Fetcher>, tile_store: String, subscribers: SubscriberRegistry,
        concurrency: usize,
    ) -> Self {
        Self { db, fetcher, tile_store, subscribers, concurrency: concurrency.max(1) }
    }

    /// Fetch every URL concurrently and cache the 2xx responses by raw URL.
    ///
    /// Per-item failures are logged and counted; they never fail the batch.
    /// Only failing to open the tile store aborts, before any fetch starts.
    pub async fn warm(&self, urls: &[String]) -> Result<WarmReport, Error> {
        tracing::info!(count = urls.len(), store = %self.tile_store, "warming tiles");
        let store = self.db.ensure_store(&self.tile_store).await.inspect_err(|e| {
            tracing::error!(store = %self.tile_store, error = %e, "cannot open tile store, warm aborted");
        })?;

        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut fetches = JoinSet::new();
        for url in urls.iter().cloned() {
            let fetcher = Arc::clone(&self.fetcher);
            let store = store.clone();
            let permits = Arc::clone(&permits);
            fetches.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return false;
                };
                match fetcher.fetch(&ResourceRequest::get(url.clone())).await {
                    Ok(response) if response.is_success() => {
                        match store.put(&RequestIdentity::get(url.clone()), &response).await {
                            Ok(()) => true,
                            Err(e) => {
                                tracing::warn!(url = %url, error = %e, "error storing tile");
                                false
                            }
                        }
                    }
                    Ok(response) => {
                        tracing::debug!(url = %url, status = response.status, "tile not cached");
                        false
                    }
                    Err(e) => {
                        tracing::warn!(url = %url, error = %e, "error caching tile");
                        false
                    }
                }
            });
        }

        let mut report = WarmReport { requested: urls.len(), ..Default::default() };
        while let Some(joined) = fetches.join_next().await {
            match joined {
                Ok(true) => report.succeeded += 1,
                Ok(false) => report.failed += 1,
                Err(e) => {
                    tracing::warn!(error = %e, "warm task failed");
                    report.failed += 1;
                }
            }
        }

        let delivered = self.subscribers.broadcast(&Notification::CacheComplete { count: report.requested }).await;
        tracing::info!(
            requested = report.requested,
            succeeded = report.succeeded,
            failed = report.failed,
            subscribers = delivered,
            "warm complete"
        );
        Ok(report)
    }

    /// Delete the tile store and notify subscribers.
    ///
    /// Returns whether the store existed. The static store is untouched.
    pub async fn clear(&self) -> Result<bool, Error> {
        let existed = self.db.delete_store(&self.tile_store).await.inspect_err(|e| {
            tracing::error!(store = %self.tile_store, error = %e, "cannot delete tile store");
        })?;
        let delivered = self.subscribers.broadcast(&Notification::CacheCleared).await;
        tracing::info!(store = %self.tile_store, existed, subscribers = delivered, "tile cache cleared");
        Ok(existed)
    }

    pub async fn handle(&self, command: Command) -> Result<CommandOutcome, Error> {
        match command {
            Command::CacheTiles { tiles } => {
                let report = self.warm(&tiles).await?;
                Ok(CommandOutcome {
                    notification: Notification::CacheComplete { count: report.requested },
                    report: Some(report),
                })
            }
            Command::ClearCache => {
                self.clear().await?;
                Ok(CommandOutcome { notification: Notification::CacheCleared, report: None })
            }
        }
    }

    /// Parse a raw JSON message and handle it.
    pub async fn dispatch_json(&self, message: serde_json::Value) -> Result<CommandOutcome, Error> {
        let command: Command =
            serde_json::from_value(message).map_err(|e| Error::InvalidInput(format!("unrecognised command: {e}")))?;
        self.handle(command).await
    }
}
