//! Retrieval policies.
//!
//! - [`TilePolicy`]: serve a cached tile as-is, fetch and populate on miss.
//! - [`FallbackPolicy`]: cache-first across all stores, network second,
//!   fallback document for HTML requests when the network fails.

pub mod fallback;
pub mod tile;

pub use fallback::FallbackPolicy;
pub use tile::TilePolicy;

use mapcache_core::{RequestIdentity, ResourceResponse, Store};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

/// Background store writes that must not delay a response.
///
/// Finished tasks are reaped on every spawn; [`WriteBack::settle`] waits
/// for whatever is still in flight.
#[derive(Clone, Default)]
pub struct WriteBack {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl WriteBack {
    pub async fn put(&self, store: Store, identity: RequestIdentity, response: ResourceResponse) {
        self.spawn(async move {
            match store.put(&identity, &response).await {
                Ok(()) => tracing::debug!(
                    store = store.name(),
                    url = %identity.url,
                    content_type = response.header("content-type"),
                    "cached response"
                ),
                Err(e) => tracing::warn!(store = store.name(), url = %identity.url, error = %e, "write-back failed"),
            }
        })
        .await;
    }

    pub(crate) async fn spawn<F>(&self, write: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().await;
        while tasks.try_join_next().is_some() {}
        tasks.spawn(write);
    }

    /// Wait until every write pending at the time of the call has finished.
    ///
    /// The lock is released before waiting, so writes queued meanwhile are
    /// never held up.
    pub async fn settle(&self) {
        let mut pending = std::mem::take(&mut *self.tasks.lock().await);
        while pending.join_next().await.is_some() {}
    }
}
