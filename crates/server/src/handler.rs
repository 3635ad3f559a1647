//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::tools::ToolContext;
use crate::tools::extract_links::{ExtractLinksParams, extract_links_impl};
use crate::tools::extract_metadata::{ExtractMetadataParams, extract_metadata_impl};
use crate::tools::extract_tables::{ExtractTablesParams, extract_tables_impl};
use crate::tools::fetch_bulk::{FetchBulkParams, fetch_bulk_impl};
use crate::tools::fetch_feed::{FetchFeedParams, fetch_feed_impl};
use crate::tools::fetch_headers::{FetchHeadersParams, fetch_headers_impl};
use crate::tools::fetch_json::{FetchJsonParams, fetch_json_impl};
use crate::tools::fetch_page::{FetchPageParams, fetch_page_impl};
use crate::tools::fetch_robots::{FetchRobotsParams, fetch_robots_impl};
use crate::tools::fetch_text::{FetchTextParams, fetch_text_impl};

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
use stealth_fetch_client::FetchConfig;
use stealth_fetch_core::{AppConfig, Error};

const INSTRUCTIONS: &str = "Fetch web content while presenting as a real browser. \
    Use fetch_text for readable page text, fetch_json for APIs, the extract_* tools for links, \
    metadata and tables, fetch_feed for RSS/Atom, and fetch_bulk for many URLs at once. \
    Every tool accepts an impersonate target such as chrome, firefox or safari.";

/// The main MCP server handler for stealth-fetch.
#[derive(Clone)]
pub struct StealthFetchServer {
    context: ToolContext,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// Every tool only reads remote resources, so all of them carry the same
/// read-only, idempotent, open-world annotations.
#[tool_router]
impl StealthFetchServer {
    /// Create a new server handler from application configuration.
    pub fn new(config: &AppConfig) -> Result<Self, Error> {
        Ok(Self::with_context(ToolContext::new(FetchConfig::from(config))?))
    }

    pub fn with_context(context: ToolContext) -> Self {
        Self { context, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Fetch a URL with browser impersonation and return the raw response body.",
        annotations(read_only_hint = true, destructive_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    async fn fetch_page(&self, params: Parameters<FetchPageParams>) -> Result<CallToolResult, McpError> {
        fetch_page_impl(&self.context, params.0).await
    }

    #[tool(
        description = "Fetch an HTML page and return its readable text, optionally scoped by a CSS selector.",
        annotations(read_only_hint = true, destructive_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    async fn fetch_text(&self, params: Parameters<FetchTextParams>) -> Result<CallToolResult, McpError> {
        fetch_text_impl(&self.context, params.0).await
    }

    #[tool(
        description = "Call a JSON API with GET or POST and return pretty-printed JSON.",
        annotations(read_only_hint = true, destructive_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    async fn fetch_json(&self, params: Parameters<FetchJsonParams>) -> Result<CallToolResult, McpError> {
        fetch_json_impl(&self.context, params.0).await
    }

    #[tool(
        description = "Extract links from a page as {text, href, absolute_url}, with optional selector and regex filter.",
        annotations(read_only_hint = true, destructive_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    async fn extract_links(&self, params: Parameters<ExtractLinksParams>) -> Result<CallToolResult, McpError> {
        extract_links_impl(&self.context, params.0).await
    }

    #[tool(
        description = "Return the status code, final URL and response headers for a URL.",
        annotations(read_only_hint = true, destructive_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    async fn fetch_headers(&self, params: Parameters<FetchHeadersParams>) -> Result<CallToolResult, McpError> {
        fetch_headers_impl(&self.context, params.0).await
    }

    #[tool(
        description = "Extract JSON-LD, OpenGraph, Twitter Card and meta tags from a page.",
        annotations(read_only_hint = true, destructive_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    async fn extract_metadata(&self, params: Parameters<ExtractMetadataParams>) -> Result<CallToolResult, McpError> {
        extract_metadata_impl(&self.context, params.0).await
    }

    #[tool(
        description = "Extract HTML tables from a page as header and row lists.",
        annotations(read_only_hint = true, destructive_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    async fn extract_tables(&self, params: Parameters<ExtractTablesParams>) -> Result<CallToolResult, McpError> {
        extract_tables_impl(&self.context, params.0).await
    }

    #[tool(
        description = "Fetch and parse an RSS, RDF or Atom feed into structured items.",
        annotations(read_only_hint = true, destructive_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    async fn fetch_feed(&self, params: Parameters<FetchFeedParams>) -> Result<CallToolResult, McpError> {
        fetch_feed_impl(&self.context, params.0).await
    }

    #[tool(
        description = "Fetch up to 50 URLs concurrently. Each URL yields its own ok or error result, in input order.",
        annotations(read_only_hint = true, destructive_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    async fn fetch_bulk(&self, params: Parameters<FetchBulkParams>) -> Result<CallToolResult, McpError> {
        fetch_bulk_impl(&self.context, params.0).await
    }

    #[tool(
        description = "Fetch and parse the robots.txt of the site hosting a URL.",
        annotations(read_only_hint = true, destructive_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    async fn fetch_robots(&self, params: Parameters<FetchRobotsParams>) -> Result<CallToolResult, McpError> {
        fetch_robots_impl(&self.context, params.0).await
    }
}

impl ServerHandler for StealthFetchServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "stealth-fetch".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(INSTRUCTIONS.into()),
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
