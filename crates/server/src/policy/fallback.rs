//! Cache-first policy with an HTML fallback document.
//!
//! General resources are looked up across every store. A miss goes to the
//! network and the result is returned without being cached; only the install
//! manifest populates the static store.

use mapcache_client::Fetcher;
use mapcache_core::{CacheDb, Error, RequestIdentity, ResourceRequest, ResourceResponse};
use std::sync::Arc;

pub struct FallbackPolicy {
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    fallback: RequestIdentity,
}

impl FallbackPolicy {
    pub fn new(db: CacheDb, fetcher: Arc<dyn Fetcher>, fallback: RequestIdentity) -> Self {
        Self { db, fetcher, fallback }
    }

    /// Answer a general request.
    ///
    /// # Errors
    ///
    /// `Error::Unresolved` when the network fails and the request either does
    /// not accept HTML or the fallback document is not cached.
    pub async fn respond(&self, request: &ResourceRequest) -> Result<ResourceResponse, Error> {
        if let Some(cached) = self.db.match_any(&request.identity()).await? {
            tracing::trace!(url = %request.url, "cache hit");
            return Ok(cached);
        }

        let err = match self.fetcher.fetch(request).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        if !request.accepts_html() {
            return Err(Error::Unresolved(format!("{}: {err}", request.url)));
        }

        match self.db.match_any(&self.fallback).await? {
            Some(document) => {
                tracing::debug!(url = %request.url, fallback = %self.fallback.url, error = %err, "serving fallback document");
                Ok(document)
            }
            None => Err(Error::Unresolved(format!("{}: {err}; fallback {} not cached", request.url, self.fallback.url))),
        }
    }
}
