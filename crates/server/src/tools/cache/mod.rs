//! Cache-management MCP tools.
//!
//! The bulk control commands plus a read-only store listing.

pub mod clear;
pub mod stores;
pub mod tiles;

pub use clear::{ClearCacheParams, clear_impl};
pub use stores::{CacheStoresParams, stores_impl};
pub use tiles::{CacheTilesParams, tiles_impl};
