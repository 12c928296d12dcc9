//! post_message tool implementation.
//!
//! Accepts a raw control-channel message such as
//! `{ "type": "CACHE_TILES", "tiles": [...] }` or `{ "type": "CLEAR_CACHE" }`.

use crate::engine::CacheEngine;
use mapcache_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the post_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PostMessageParams {
    /// The command object, tagged by `type`.
    pub message: serde_json::Value,
}

/// Implementation of the post_message tool.
pub async fn message_impl(engine: &CacheEngine, params: PostMessageParams) -> Result<CallToolResult, McpError> {
    let outcome = engine.control().dispatch_json(params.message).await?;
    let json = serde_json::to_string_pretty(&outcome)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{origin, serving_engine};
    use mapcache_core::AppConfig;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_message_clear_cache() {
        let engine = serving_engine(&AppConfig::default(), Arc::new(origin())).await;
        let params = PostMessageParams { message: json!({ "type": "CLEAR_CACHE" }) };

        let result = message_impl(&engine, params).await.unwrap();
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val.get("text").and_then(|v| v.as_str()).unwrap();
        let output: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(output["notification"], json!({ "type": "CACHE_CLEARED" }));
    }

    #[tokio::test]
    async fn test_message_unknown_type() {
        let engine = serving_engine(&AppConfig::default(), Arc::new(origin())).await;
        let params = PostMessageParams { message: json!({ "type": "PING" }) };

        let err = message_impl(&engine, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
