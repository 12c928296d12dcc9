//! resource_fetch tool implementation.
//!
//! Routes one request through the cache engine exactly as an intercepted
//! request would be, and reports the response.

use crate::engine::CacheEngine;
use mapcache_core::{Error, ResourceRequest, ResourceResponse};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input parameters for the resource_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResourceFetchParams {
    /// Absolute URL of the resource.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Accept header sent by the client, e.g. "text/html".
    #[serde(default)]
    pub accept: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the resource_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResourceFetchOutput {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, when it is valid UTF-8.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_text: Option<String>,
    pub body_bytes: usize,
}

impl From<ResourceResponse> for ResourceFetchOutput {
    fn from(response: ResourceResponse) -> Self {
        let body_text = std::str::from_utf8(&response.body).ok().map(str::to_string);
        Self { status: response.status, body_bytes: response.body.len(), headers: response.headers, body_text }
    }
}

/// Implementation of the resource_fetch tool.
pub async fn fetch_impl(engine: &CacheEngine, params: ResourceFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let request = ResourceRequest { method: params.method, url: params.url, accept: params.accept };
    let response = engine.on_request(&request).await?;

    let output = ResourceFetchOutput::from(response);
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize response: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
