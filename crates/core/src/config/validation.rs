//! Configuration validation rules.
//!
//! Checks run after `AppConfig` has been loaded from environment, files,
//! or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `origin` is not an absolute http(s) URL
    /// - `manifest` is empty or an entry cannot be resolved
    /// - `tile_host_pattern` is not a valid regex
    /// - the static and tile stores share a name
    /// - `warm_concurrency` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") => {}
            Ok(origin) => return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme()))),
            Err(e) => return Err(invalid("origin", e.to_string())),
        }

        if self.manifest.is_empty() {
            return Err(invalid("manifest", "must list at least one resource"));
        }
        self.manifest_urls()?;
        self.resolve(&self.fallback_document)
            .map_err(|_| invalid("fallback_document", "cannot be resolved against origin"))?;

        regex::Regex::new(&self.tile_host_pattern).map_err(|e| invalid("tile_host_pattern", e.to_string()))?;

        if self.static_store.name() == self.tile_store.name() {
            return Err(invalid("tile_store", "must not share a name with static_store"));
        }

        if self.warm_concurrency == 0 {
            return Err(invalid("warm_concurrency", "must be at least 1"));
        }

        if !self.fallback_in_manifest()? {
            tracing::warn!(
                fallback = %self.fallback_document,
                "fallback document is not in the manifest; offline HTML requests will go unresolved \
                 unless another store holds it"
            );
        }

        Ok(())
    }

    /// Whether install seeds the fallback document.
    ///
    /// Both sides are compared after resolving against `origin`, so `/index.html`
    /// and `http://localhost:8080/index.html` name the same resource.
    pub fn fallback_in_manifest(&self) -> Result<bool, ConfigError> {
        let fallback = self.resolve(&self.fallback_document)?;
        Ok(self.manifest_urls()?.contains(&fallback))
    }
}
