//! Tile policy: a cached tile is served without revalidation.
//!
//! Tiles are immutable by URL, so a hit never touches the network. On a miss
//! the tile is fetched, a 2xx response is written back in the background, and
//! any fetch failure becomes a synthetic empty 404.

use super::WriteBack;
use mapcache_client::Fetcher;
use mapcache_core::{CacheDb, Error, ResourceRequest, ResourceResponse};
use std::sync::Arc;

pub struct TilePolicy {
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    store_name: String,
    writes: WriteBack,
}

impl TilePolicy {
    pub fn new(db: CacheDb, fetcher: Arc<dyn Fetcher>, store_name: String, writes: WriteBack) -> Self {
        Self { db, fetcher, store_name, writes }
    }

    /// Answer a tile request.
    ///
    /// Only a storage failure surfaces as an error; network failures never do.
    pub async fn respond(&self, request: &ResourceRequest) -> Result<ResourceResponse, Error> {
        let store = self.db.ensure_store(&self.store_name).await?;
        let identity = request.identity();

        if let Some(cached) = store.get(&identity).await? {
            tracing::trace!(url = %request.url, "tile cache hit");
            return Ok(cached);
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.writes.put(store, identity, response.clone()).await;
                }
                Ok(response)
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "tile fetch failed, serving empty 404");
                Ok(ResourceResponse::not_found())
            }
        }
    }
}
