//! Request classification.
//!
//! Every request is classified exactly once. Tile classification takes
//! precedence; everything else is general.

use mapcache_core::Error;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Tile origin; served by the tile policy.
    Tile,
    /// Any other resource; served cache-first with an HTML fallback.
    General,
}

#[derive(Debug, Clone)]
pub struct Router {
    tile_host: Regex,
}

impl Router {
    /// Build a router from an unanchored hostname pattern.
    pub fn new(tile_host_pattern: &str) -> Result<Self, Error> {
        let tile_host = Regex::new(tile_host_pattern)
            .map_err(|e| Error::InvalidInput(format!("invalid tile host pattern: {e}")))?;
        Ok(Self { tile_host })
    }

    /// Classify a request URL by its hostname.
    ///
    /// URLs that do not parse, or have no host, are general.
    pub fn classify(&self, url: &str) -> RouteClass {
        let is_tile = url::Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(|host| self.tile_host.is_match(host)))
            .unwrap_or(false);

        if is_tile { RouteClass::Tile } else { RouteClass::General }
    }
}
