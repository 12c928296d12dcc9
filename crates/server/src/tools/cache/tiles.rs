//! cache_tiles tool implementation.
//!
//! Pre-warms the tile store with a batch of URLs.

use crate::control::Command;
use crate::engine::CacheEngine;
use mapcache_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_tiles tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheTilesParams {
    /// Tile URLs to fetch and cache, keyed by the exact string given.
    pub tiles: Vec<String>,
}

/// Implementation of the cache_tiles tool.
///
/// Returns the `CACHE_COMPLETE` notification that was broadcast together
/// with the success/failure breakdown.
pub async fn tiles_impl(engine: &CacheEngine, params: CacheTilesParams) -> Result<CallToolResult, McpError> {
    let outcome = engine
        .control()
        .handle(Command::CacheTiles { tiles: params.tiles })
        .await?;
    let json = serde_json::to_string_pretty(&outcome)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{origin, serving_engine};
    use mapcache_core::AppConfig;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_tiles_impl_reports_submitted_count() {
        let fetcher = origin().respond("https://tile.openstreetmap.org/2/1/1.png", 200, "png");
        let engine = serving_engine(&AppConfig::default(), Arc::new(fetcher)).await;
        let params = CacheTilesParams {
            tiles: vec![
                "https://tile.openstreetmap.org/2/1/1.png".to_string(),
                "https://tile.openstreetmap.org/2/1/2.png".to_string(),
            ],
        };

        let result = tiles_impl(&engine, params).await.unwrap();
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        let output: serde_json::Value = serde_json::from_str(text).unwrap();

        assert_eq!(output["notification"], serde_json::json!({ "type": "CACHE_COMPLETE", "count": 2 }));
        assert_eq!(output["report"]["succeeded"], 1);
        assert_eq!(output["report"]["failed"], 1);
    }
}
