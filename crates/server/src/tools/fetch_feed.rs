//! fetch_feed tool: RSS, RDF and Atom feeds as structured items.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stealth_fetch_client::{FetchRequest, RequestOptions, SessionOptions, parse_feed};
use stealth_fetch_core::{Error, truncate};

use super::{
    Overrides, ToolContext, default_max_chars, merge_request_options, require_max_chars, require_range, text_result,
    to_json, validate_request,
};

fn default_max_items() -> usize {
    50
}

/// Parameters for the fetch_feed tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FetchFeedParams {
    /// Feed URL (http:// or https://)
    pub url: String,

    /// Browser to impersonate (default: chrome)
    #[serde(default)]
    pub impersonate: Option<String>,

    /// Maximum items to return (default: 50, max: 500)
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Maximum characters of output (default: 100000)
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    #[serde(default)]
    pub session_options: Option<SessionOptions>,

    #[serde(default)]
    pub request_options: Option<RequestOptions>,
}

impl FetchFeedParams {
    pub fn validate(&self) -> Result<(), Error> {
        validate_request(
            &self.url,
            self.impersonate.as_deref(),
            self.session_options.as_ref(),
            self.request_options.as_ref(),
        )?;
        require_range("max_items", self.max_items, 1, 500)?;
        require_max_chars(self.max_chars)
    }
}

pub async fn fetch_feed_impl(ctx: &ToolContext, params: FetchFeedParams) -> Result<CallToolResult, McpError> {
    params.validate()?;

    let options = merge_request_options(
        params.request_options,
        Overrides { impersonate: params.impersonate, ..Default::default() },
    );
    let fetcher = ctx.fetcher(params.session_options)?;
    let result = fetcher.fetch(FetchRequest::get(params.url).with_options(options)).await?;

    let feed = parse_feed(&result.text, params.max_items)?;
    Ok(text_result(truncate(&to_json(&feed)?, params.max_chars)))
}
