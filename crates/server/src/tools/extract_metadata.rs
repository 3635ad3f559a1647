//! extract_metadata tool: JSON-LD, OpenGraph, Twitter and named meta tags.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stealth_fetch_client::{FetchRequest, RequestOptions, SessionOptions, extract_metadata};
use stealth_fetch_core::{Error, truncate};

use super::{
    Overrides, ToolContext, default_max_chars, merge_request_options, require_max_chars, text_result, to_json,
    validate_request,
};

/// Parameters for the extract_metadata tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ExtractMetadataParams {
    /// Page URL (http:// or https://)
    pub url: String,

    /// Browser to impersonate (default: chrome)
    #[serde(default)]
    pub impersonate: Option<String>,

    /// Maximum characters of output (default: 100000)
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    #[serde(default)]
    pub session_options: Option<SessionOptions>,

    #[serde(default)]
    pub request_options: Option<RequestOptions>,
}

impl ExtractMetadataParams {
    pub fn validate(&self) -> Result<(), Error> {
        validate_request(
            &self.url,
            self.impersonate.as_deref(),
            self.session_options.as_ref(),
            self.request_options.as_ref(),
        )?;
        require_max_chars(self.max_chars)
    }
}

pub async fn extract_metadata_impl(
    ctx: &ToolContext, params: ExtractMetadataParams,
) -> Result<CallToolResult, McpError> {
    params.validate()?;

    let options = merge_request_options(
        params.request_options,
        Overrides { impersonate: params.impersonate, ..Default::default() },
    );
    let fetcher = ctx.fetcher(params.session_options)?;
    let result = fetcher.fetch(FetchRequest::get(params.url).with_options(options)).await?;

    let bundle = extract_metadata(&result.text);
    Ok(text_result(truncate(&to_json(&bundle)?, params.max_chars)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, json};

    use super::*;
    use crate::tools::testing::{StubFetcher, context, text_of};

    const PAGE: &str = r#"<html><head>
        <meta property="og:title" content="Widget">
        <meta name="twitter:card" content="summary">
        <meta name="description" content="A widget page">
        <script type="application/ld+json">{"@type": "Product", "name": "Widget"}</script>
    </head><body></body></html>"#;

    #[tokio::test]
    async fn test_bundle_output() {
        let stub = Arc::new(StubFetcher::body(PAGE));
        let p: ExtractMetadataParams = serde_json::from_value(json!({"url": "https://shop.test/w"})).unwrap();
        let result = extract_metadata_impl(&context(stub), p).await.unwrap();

        let out: Value = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(out["opengraph"]["title"], "Widget");
        assert_eq!(out["twitter"]["card"], "summary");
        assert_eq!(out["meta"]["description"], "A widget page");
        assert_eq!(out["json_ld"][0]["name"], "Widget");
    }

    #[tokio::test]
    async fn test_invalid_url_makes_no_call() {
        let stub = Arc::new(StubFetcher::body(PAGE));
        let p: ExtractMetadataParams = serde_json::from_value(json!({"url": "javascript:alert(1)"})).unwrap();
        assert!(extract_metadata_impl(&context(stub.clone()), p).await.is_err());
        assert_eq!(stub.calls(), 0);
    }
}
