//! extract_links tool: harvest links from a page.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stealth_fetch_client::extract::links::DEFAULT_LINK_SELECTOR;
use stealth_fetch_client::{
    FetchRequest, RequestOptions, SessionOptions, compile_pattern, extract_links, parse_http_url, parse_selector,
};
use stealth_fetch_core::{Error, truncate};

use super::{
    Overrides, ToolContext, default_max_chars, merge_request_options, require_max_chars, require_range, text_result,
    to_json, validate_request,
};

fn default_selector() -> String {
    DEFAULT_LINK_SELECTOR.to_string()
}

fn default_max_results() -> usize {
    100
}

/// Parameters for the extract_links tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ExtractLinksParams {
    /// Page URL (http:// or https://)
    pub url: String,

    /// Browser to impersonate (default: chrome)
    #[serde(default)]
    pub impersonate: Option<String>,

    /// CSS selector for link elements (default: "a[href]")
    #[serde(default = "default_selector")]
    pub selector: String,

    /// Regex that must match somewhere in the raw href
    #[serde(default)]
    pub pattern: Option<String>,

    /// Maximum links to return (default: 100, max: 10000)
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Maximum characters of output (default: 100000)
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    #[serde(default)]
    pub session_options: Option<SessionOptions>,

    #[serde(default)]
    pub request_options: Option<RequestOptions>,
}

impl ExtractLinksParams {
    pub fn validate(&self) -> Result<(), Error> {
        validate_request(
            &self.url,
            self.impersonate.as_deref(),
            self.session_options.as_ref(),
            self.request_options.as_ref(),
        )?;
        parse_selector(&self.selector)?;
        if let Some(pattern) = &self.pattern {
            compile_pattern(pattern)?;
        }
        require_range("max_results", self.max_results, 1, 10_000)?;
        require_max_chars(self.max_chars)
    }
}

pub async fn extract_links_impl(ctx: &ToolContext, params: ExtractLinksParams) -> Result<CallToolResult, McpError> {
    params.validate()?;
    let selector = parse_selector(&params.selector)?;
    let pattern = params.pattern.as_deref().map(compile_pattern).transpose()?;

    let options = merge_request_options(
        params.request_options,
        Overrides { impersonate: params.impersonate, ..Default::default() },
    );
    let fetcher = ctx.fetcher(params.session_options)?;
    let result = fetcher.fetch(FetchRequest::get(params.url).with_options(options)).await?;

    // Relative hrefs resolve against where the page actually landed.
    let base = parse_http_url(&result.final_url).map_err(Error::from)?;
    let links = extract_links(&result.text, &base, &selector, pattern.as_ref(), params.max_results);

    Ok(text_result(truncate(&to_json(&links)?, params.max_chars)))
}
