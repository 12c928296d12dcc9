//! Core types and shared functionality for mapcache.
//!
//! This crate provides:
//! - Store registry backed by SQLite
//! - Request identity and response value types
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod resource;

pub use cache::{CacheDb, Store, StoreSummary};
pub use config::{AppConfig, ConfigError, StoreConfig};
pub use error::Error;
pub use resource::{RequestIdentity, ResourceRequest, ResourceResponse};
