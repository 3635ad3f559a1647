//! fetch_page tool: raw response body with a character cap.

use std::collections::BTreeMap;

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stealth_fetch_client::{FetchRequest, RequestOptions, SessionOptions};
use stealth_fetch_core::{Error, truncate};

use super::{
    Overrides, ToolContext, default_max_chars, default_timeout, default_true, merge_request_options, require_max_chars,
    require_timeout, text_result, validate_request,
};

/// Parameters for the fetch_page tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FetchPageParams {
    /// Target URL (http:// or https://)
    pub url: String,

    /// Browser to impersonate, e.g. chrome, firefox133, safari17_0 (default: chrome)
    #[serde(default)]
    pub impersonate: Option<String>,

    /// Extra request headers
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,

    /// Request timeout in seconds (default: 30, max: 300)
    #[serde(default = "default_timeout")]
    pub timeout: f64,

    /// Follow HTTP redirects (default: true)
    #[serde(default = "default_true")]
    pub follow_redirects: bool,

    /// Maximum characters of body to return (default: 100000)
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Options for a dedicated transport session used for this call only
    #[serde(default)]
    pub session_options: Option<SessionOptions>,

    /// Per-request transport options; explicit tool parameters take precedence
    #[serde(default)]
    pub request_options: Option<RequestOptions>,
}

impl FetchPageParams {
    pub fn validate(&self) -> Result<(), Error> {
        validate_request(
            &self.url,
            self.impersonate.as_deref(),
            self.session_options.as_ref(),
            self.request_options.as_ref(),
        )?;
        require_timeout("timeout", self.timeout)?;
        require_max_chars(self.max_chars)
    }
}

pub async fn fetch_page_impl(ctx: &ToolContext, params: FetchPageParams) -> Result<CallToolResult, McpError> {
    params.validate()?;

    let options = merge_request_options(
        params.request_options,
        Overrides {
            impersonate: params.impersonate,
            headers: params.headers,
            timeout: Some(params.timeout),
            follow_redirects: Some(params.follow_redirects),
        },
    );
    let fetcher = ctx.fetcher(params.session_options)?;
    let result = fetcher.fetch(FetchRequest::get(params.url).with_options(options)).await?;

    Ok(text_result(truncate(&result.text, params.max_chars)))
}
