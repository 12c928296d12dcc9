//! SQLite-backed store registry for cached resources.
//!
//! This module provides named, versioned stores of request/response entries
//! using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Idempotent store creation and deletion
//! - Per-store entry reads, upserts and all-or-nothing batch writes
//! - Store-agnostic lookup across every store in creation order
//! - Automatic schema migrations

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::Store;
pub use stores::StoreSummary;
