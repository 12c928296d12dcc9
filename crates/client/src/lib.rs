//! Network client for mapcache.
//!
//! This crate provides the origin-fetch seam used by the cache engine and
//! its reqwest-backed implementation.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, Fetcher};
