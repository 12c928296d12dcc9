//! MCP tool implementations.
//!
//! This module contains all tools exposed by the mapcache server.

pub mod cache;
pub mod message;
pub mod resource_fetch;

