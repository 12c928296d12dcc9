//! Application configuration with layered loading.
//!
//! Configuration is loaded with figment from, in increasing precedence:
//!
//! 1. Built-in defaults
//! 2. TOML config file (if MAPCACHE_CONFIG_FILE set)
//! 3. Environment variables (MAPCACHE_*, `__` separates nested keys)

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// A store family and its version tag.
///
/// The version must change whenever the family's content-affecting logic
/// changes, so the superseded store is deleted on the next activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub family: String,
    pub version: String,
}

impl StoreConfig {
    pub fn new(family: impl Into<String>, version: impl Into<String>) -> Self {
        Self { family: family.into(), version: version.into() }
    }

    /// Persisted store name, `{family}-{version}`.
    pub fn name(&self) -> String {
        format!("{}-{}", self.family, self.version)
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite store database.
    ///
    /// Set via MAPCACHE_DB_PATH.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for origin requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum response body size in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Origin request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of redirects followed per fetch.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Base URL the manifest and fallback document are resolved against.
    ///
    /// Set via MAPCACHE_ORIGIN.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Resources seeded into the static store at install.
    ///
    /// Set via MAPCACHE_MANIFEST (TOML array) or the config file.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Document served to HTML requests when the network fails.
    #[serde(default = "default_fallback_document")]
    pub fallback_document: String,

    /// Static asset store; set via MAPCACHE_STATIC_STORE__VERSION etc.
    #[serde(default = "default_static_store")]
    pub static_store: StoreConfig,

    /// Tile store, versioned independently of the static store.
    #[serde(default = "default_tile_store")]
    pub tile_store: StoreConfig,

    /// Regex matched (unanchored) against a request's hostname to
    /// classify it as a tile.
    #[serde(default = "default_tile_host_pattern")]
    pub tile_host_pattern: String,

    /// Maximum number of concurrent fetches in one warm batch.
    #[serde(default = "default_warm_concurrency")]
    pub warm_concurrency: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./mapcache.sqlite")
}

fn default_user_agent() -> String {
    "mapcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_redirects() -> usize {
    5
}

fn default_origin() -> String {
    "http://localhost:8080/".into()
}

fn default_manifest() -> Vec<String> {
    vec!["/".into(), "/index.html".into()]
}

fn default_fallback_document() -> String {
    "/index.html".into()
}

fn default_static_store() -> StoreConfig {
    StoreConfig::new("gps-marker", "v1")
}

fn default_tile_store() -> StoreConfig {
    StoreConfig::new("map-tiles", "v1")
}

fn default_tile_host_pattern() -> String {
    r"tile\.openstreetmap\.org".into()
}

fn default_warm_concurrency() -> usize {
    8
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
            origin: default_origin(),
            manifest: default_manifest(),
            fallback_document: default_fallback_document(),
            static_store: default_static_store(),
            tile_store: default_tile_store(),
            tile_host_pattern: default_tile_host_pattern(),
            warm_concurrency: default_warm_concurrency(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Resolve a manifest or fallback path against `origin`.
    ///
    /// Absolute URLs are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` or the joined URL is malformed.
    pub fn resolve(&self, path: &str) -> Result<String, ConfigError> {
        let origin = url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        origin
            .join(path)
            .map(String::from)
            .map_err(|e| ConfigError::Invalid { field: "manifest".into(), reason: format!("{path}: {e}") })
    }

    /// Manifest entries resolved to absolute URLs, in declaration order.
    pub fn manifest_urls(&self) -> Result<Vec<String>, ConfigError> {
        self.manifest.iter().map(|path| self.resolve(path)).collect()
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("MAPCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("MAPCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./mapcache.sqlite"));
        assert_eq!(config.user_agent, "mapcache/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.manifest, vec!["/".to_string(), "/index.html".to_string()]);
        assert_eq!(config.fallback_document, "/index.html");
        assert_eq!(config.warm_concurrency, 8);
    }

    #[test]
    fn test_default_store_names() {
        let config = AppConfig::default();
        assert_eq!(config.static_store.name(), "gps-marker-v1");
        assert_eq!(config.tile_store.name(), "map-tiles-v1");
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_manifest_urls_resolve_against_origin() {
        let config = AppConfig { origin: "https://maps.example.com/app/".into(), ..Default::default() };
        let urls = config.manifest_urls().unwrap();
        assert_eq!(urls, vec!["https://maps.example.com/".to_string(), "https://maps.example.com/index.html".to_string()]);
    }

    #[test]
    fn test_resolve_keeps_absolute_urls() {
        let config = AppConfig::default();
        assert_eq!(config.resolve("https://cdn.example.com/app.css").unwrap(), "https://cdn.example.com/app.css");
    }

    #[test]
    fn test_load_from_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("MAPCACHE_TILE_STORE__VERSION", "v7");
            jail.set_env("MAPCACHE_WARM_CONCURRENCY", "2");
            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.tile_store.name(), "map-tiles-v7");
            assert_eq!(config.static_store.name(), "gps-marker-v1");
            assert_eq!(config.warm_concurrency, 2);
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "mapcache.toml",
                r#"
                origin = "https://maps.example.com/"
                manifest = ["/", "/index.html", "/app.js"]

                [static_store]
                family = "gps-marker"
                version = "v2"
                "#,
            )?;
            jail.set_env("MAPCACHE_CONFIG_FILE", "mapcache.toml");
            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.static_store.name(), "gps-marker-v2");
            assert_eq!(config.manifest.len(), 3);
            Ok(())
        });
    }
}
