//! cache_stores tool implementation.
//!
//! Lists every persisted store with its entry count.

use crate::engine::CacheEngine;
use mapcache_core::{Error, StoreSummary};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_stores tool (none).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheStoresParams {}

/// Output from the cache_stores tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStoresOutput {
    pub stores: Vec<StoreSummary>,
}

/// Implementation of the cache_stores tool.
pub async fn stores_impl(engine: &CacheEngine, _params: CacheStoresParams) -> Result<CallToolResult, McpError> {
    let stores = engine.db().store_summaries().await?;
    let json = serde_json::to_string_pretty(&CacheStoresOutput { stores })
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
    async fn test_stores_impl_lists_manifest_store() {
        let engine = serving_engine(&AppConfig::default(), Arc::new(origin())).await;

        let result = stores_impl(&engine, CacheStoresParams::default()).await.unwrap();
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val.get("text").and_then(|v| v.as_str()).unwrap();
        let output: CacheStoresOutput = serde_json::from_str(text).unwrap();

        assert_eq!(output.stores.len(), 1);
        assert_eq!(output.stores[0].name, "gps-marker-v1");
        assert_eq!(output.stores[0].entries, 2);
    }
}
