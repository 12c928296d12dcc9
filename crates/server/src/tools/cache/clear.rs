//! clear_cache tool implementation.
//!
//! Drops the tile store; the static store is never touched.

use crate::control::Command;
use crate::engine::CacheEngine;
use mapcache_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the clear_cache tool (none).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ClearCacheParams {}

/// Implementation of the clear_cache tool.
pub async fn clear_impl(engine: &CacheEngine, _params: ClearCacheParams) -> Result<CallToolResult, McpError> {
    let outcome = engine.control().handle(Command::ClearCache).await?;
    let json = serde_json::to_string_pretty(&outcome)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
