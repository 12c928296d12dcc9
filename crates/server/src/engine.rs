//! The cache engine: lifecycle, routing and the control channel wired over
//! one store registry and one fetcher.

use crate::control::ControlChannel;
use crate::lifecycle::{Lifecycle, Phase};
use crate::policy::{FallbackPolicy, TilePolicy, WriteBack};
use crate::router::{RouteClass, Router};
use crate::subscribers::SubscriberRegistry;
use mapcache_client::Fetcher;
use mapcache_core::{AppConfig, CacheDb, Error, RequestIdentity, ResourceRequest, ResourceResponse};
use std::sync::Arc;

/// One service instance: lifecycle, routing and control over a shared store registry.
pub struct CacheEngine {
    db: CacheDb,
    router: Router,
    tiles: TilePolicy,
    general: FallbackPolicy,
    lifecycle: Lifecycle,
    control: ControlChannel,
    subscribers: SubscriberRegistry,
    writes: WriteBack,
}

impl CacheEngine {
    pub fn new(config: &AppConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let config_error = |e: mapcache_core::ConfigError| Error::InvalidInput(e.to_string());
        let static_store = config.static_store.name();
        let tile_store = config.tile_store.name();
        let manifest = config.manifest_urls().map_err(config_error)?;
        let fallback = RequestIdentity::get(config.resolve(&config.fallback_document).map_err(config_error)?);

        let writes = WriteBack::default();
        let subscribers = SubscriberRegistry::new();

        Ok(Self {
            router: Router::new(&config.tile_host_pattern)?,
            tiles: TilePolicy::new(db.clone(), Arc::clone(&fetcher), tile_store.clone(), writes.clone()),
            general: FallbackPolicy::new(db.clone(), Arc::clone(&fetcher), fallback),
            lifecycle: Lifecycle::new(db.clone(), Arc::clone(&fetcher), static_store, tile_store.clone(), manifest),
            control: ControlChannel::new(
                db.clone(),
                fetcher,
                tile_store,
                subscribers.clone(),
                config.warm_concurrency,
            ),
            db,
            subscribers,
            writes,
        })
    }

    pub async fn on_install(&self) -> Result<(), Error> {
        self.lifecycle.install().await
    }

    pub async fn on_activate(&self) -> Result<Vec<String>, Error> {
        self.lifecycle.activate().await
    }

    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    /// Route one intercepted request. Held until the engine is serving.
    pub async fn on_request(&self, request: &ResourceRequest) -> Result<ResourceResponse, Error> {
        self.lifecycle.wait_serving().await?;
        match self.router.classify(&request.url) {
            RouteClass::Tile => self.tiles.respond(request).await,
            RouteClass::General => self.general.respond(request).await,
        }
    }

    pub fn control(&self) -> &ControlChannel {
        &self.control
    }

    pub fn subscribers(&self) -> &SubscriberRegistry {
        &self.subscribers
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// Wait for background tile writes to land.
    pub async fn settle_writes(&self) {
        self.writes.settle().await;
    }
}
