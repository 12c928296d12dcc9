//! Install and activate transitions.
//!
//! Phases move `Pending -> Installed -> Serving`. Install seeds the static
//! store with the whole manifest or nothing; activate deletes every store
//! that is neither the current static store nor the current tile store.
//! Requests wait for `Serving` before they are routed.

use mapcache_client::Fetcher;
use mapcache_core::{CacheDb, Error, RequestIdentity, ResourceRequest, ResourceResponse};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Where the instance is in its install and activate sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Installed,
    Serving,
}

pub struct Lifecycle {
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    static_store: String,
    tile_store: String,
    manifest: Vec<String>,
    phase: watch::Sender<Phase>,
}

impl Lifecycle {
    pub fn new(
        db: CacheDb, fetcher: Arc<dyn Fetcher>, static_store: String, tile_store: String, manifest: Vec<String>,
    ) -> Self {
        let (phase, _) = watch::channel(Phase::Pending);
        Self { db, fetcher, static_store, tile_store, manifest, phase }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Seed the static store with every manifest entry.
    ///
    /// All entries are fetched concurrently; any transport failure or non-2xx
    /// status fails the install and nothing is written.
    pub async fn install(&self) -> Result<(), Error> {
        tracing::info!(store = %self.static_store, entries = self.manifest.len(), "installing");
        let store = self.db.ensure_store(&self.static_store).await?;

        let mut fetches = JoinSet::new();
        for (index, url) in self.manifest.iter().cloned().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            fetches.spawn(async move {
                let result = fetcher.fetch(&ResourceRequest::get(url.clone())).await;
                (index, url, result)
            });
        }

        let mut seeded: Vec<Option<(RequestIdentity, ResourceResponse)>> = vec![None; self.manifest.len()];
        while let Some(joined) = fetches.join_next().await {
            let (index, url, result) =
                joined.map_err(|e| Error::InstallFailed(format!("manifest fetch task failed: {e}")))?;
            let response = result.map_err(|e| Error::InstallFailed(format!("{url}: {e}")))?;
            if !response.is_success() {
                return Err(Error::InstallFailed(format!("{url}: status {}", response.status)));
            }
            seeded[index] = Some((RequestIdentity::get(url), response));
        }

        let entries: Vec<_> = seeded.into_iter().flatten().collect();
        store.put_all(&entries).await?;

        self.phase.send_if_modified(|phase| {
            let advance = *phase == Phase::Pending;
            if advance {
                *phase = Phase::Installed;
            }
            advance
        });
        tracing::info!(store = %self.static_store, entries = entries.len(), "install complete");
        Ok(())
    }

    /// Delete superseded stores and start serving.
    ///
    /// Returns the names of the deleted stores.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        if self.phase() == Phase::Pending {
            return Err(Error::Lifecycle("activate requested before a successful install".into()));
        }

        tracing::info!("activating");
        let mut deleted = Vec::new();
        for name in self.db.store_names().await? {
            if name == self.static_store || name == self.tile_store {
                continue;
            }
            if self.db.delete_store(&name).await? {
                tracing::info!(store = %name, "deleted superseded store");
                deleted.push(name);
            }
        }

        self.phase.send_replace(Phase::Serving);
        Ok(deleted)
    }

    /// Resolve once the lifecycle reaches `Serving`.
    pub async fn wait_serving(&self) -> Result<(), Error> {
        let mut phase = self.phase.subscribe();
        phase
            .wait_for(|phase| *phase == Phase::Serving)
            .await
            .map(|_| ())
            .map_err(|_| Error::Lifecycle("lifecycle dropped before serving".into()))
    }
}
