//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls into the cache engine.
use crate::engine::CacheEngine;
use crate::tools::cache::{
    CacheStoresParams, CacheTilesParams, ClearCacheParams, clear_impl, stores_impl, tiles_impl,
};
use crate::tools::message::{PostMessageParams, message_impl};
use crate::tools::resource_fetch::{ResourceFetchParams, fetch_impl};
use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for mapcache.
#[derive(Clone)]
pub struct MapCacheServer {
    engine: Arc<CacheEngine>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl MapCacheServer {
    /// Create a new server handler over a serving engine.
    pub fn new(engine: Arc<CacheEngine>) -> Self {
        Self { engine, tool_router: Self::tool_router() }
    }

    #[tool(description = "Request a resource through the offline cache. Tiles are served cache-first and never \
                          revalidated; other resources are served cache-first with an HTML fallback when offline.")]
    async fn resource_fetch(&self, params: Parameters<ResourceFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.engine, params.0).await
    }

    #[tool(description = "Pre-cache a batch of tile URLs. Broadcasts CACHE_COMPLETE with the number of URLs \
                          submitted and returns the success/failure breakdown.")]
    async fn cache_tiles(&self, params: Parameters<CacheTilesParams>) -> Result<CallToolResult, McpError> {
        tiles_impl(&self.engine, params.0).await
    }

    #[tool(description = "Delete the tile cache. The static asset cache is kept. Broadcasts CACHE_CLEARED.")]
    async fn clear_cache(&self, params: Parameters<ClearCacheParams>) -> Result<CallToolResult, McpError> {
        clear_impl(&self.engine, params.0).await
    }

    #[tool(description = "Post a raw control message: {\"type\": \"CACHE_TILES\", \"tiles\": [...]} or \
                          {\"type\": \"CLEAR_CACHE\"}.")]
    async fn post_message(&self, params: Parameters<PostMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.engine, params.0).await
    }

    #[tool(description = "List cache stores with their entry counts.")]
    async fn cache_stores(&self, params: Parameters<CacheStoresParams>) -> Result<CallToolResult, McpError> {
        stores_impl(&self.engine, params.0).await
    }
}

impl ServerHandler for MapCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "mapcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{origin, serving_engine};
    use mapcache_core::AppConfig;

    #[tokio::test]
    async fn test_tools_are_registered() {
        let engine = serving_engine(&AppConfig::default(), Arc::new(origin())).await;
        let server = MapCacheServer::new(Arc::new(engine));
        let names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        for expected in ["resource_fetch", "cache_tiles", "clear_cache", "post_message", "cache_stores"] {
            assert!(names.iter().any(|n| n == expected), "missing tool {expected}");
        }
    }
}
