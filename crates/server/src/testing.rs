//! Test support: a scripted [`Fetcher`], the default origin and a
//! ready-to-serve engine built by [`serving_engine`].

use crate::engine::CacheEngine;
use async_trait::async_trait;
use bytes::Bytes;
use mapcache_client::Fetcher;
use mapcache_core::{AppConfig, CacheDb, Error, ResourceRequest, ResourceResponse};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
enum Reply {
    Respond(u16, Bytes),
    Fail,
}

/// A [`Fetcher`] answering from a per-URL script and counting calls.
///
/// Unscripted URLs fail like an unreachable network.
#[derive(Default)]
pub struct MockFetcher {
    routes: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, url: &str, status: u16, body: &'static str) -> Self {
        self.set(url, status, body);
        self
    }

    pub fn fail(self, url: &str) -> Self {
        self.routes.lock().unwrap().insert(url.to_string(), Reply::Fail);
        self
    }

    /// Replace the scripted reply for `url` in place.
    pub fn set(&self, url: &str, status: u16, body: &'static str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Reply::Respond(status, Bytes::from_static(body.as_bytes())));
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &ResourceRequest) -> Result<ResourceResponse, Error> {
        self.calls.lock().unwrap().push(request.url.clone());
        let reply = self.routes.lock().unwrap().get(&request.url).cloned();
        match reply {
            Some(Reply::Respond(status, body)) => {
                Ok(ResourceResponse::new(status, vec![("content-type".into(), "application/octet-stream".into())], body))
            }
            Some(Reply::Fail) | None => Err(Error::FetchFailed(format!("{}: network unreachable", request.url))),
        }
    }
}

pub const ROOT: &str = "http://localhost:8080/";
pub const SHELL: &str = "http://localhost:8080/index.html";

/// An origin serving the default manifest.
pub fn origin() -> MockFetcher {
    MockFetcher::new().respond(ROOT, 200, "<html>root</html>").respond(SHELL, 200, "<html>shell</html>")
}

/// An in-memory engine that has installed and activated with `config`.
pub async fn serving_engine(config: &AppConfig, fetcher: Arc<MockFetcher>) -> CacheEngine {
    let db = CacheDb::open_in_memory().await.unwrap();
    let engine = CacheEngine::new(config, db, fetcher).unwrap();
    engine.on_install().await.unwrap();
    engine.on_activate().await.unwrap();
    engine
}
