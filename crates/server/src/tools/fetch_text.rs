//! fetch_text tool: readable text extracted from an HTML page.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stealth_fetch_client::{FetchRequest, RequestOptions, SessionOptions, clean_html, parse_selector};
use stealth_fetch_core::Error;

use super::{Overrides, ToolContext, merge_request_options, require_max_chars, text_result, validate_request};

fn default_text_max_chars() -> usize {
    50_000
}

/// Parameters for the fetch_text tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FetchTextParams {
    /// Target URL (http:// or https://)
    pub url: String,

    /// Browser to impersonate (default: chrome)
    #[serde(default)]
    pub impersonate: Option<String>,

    /// Optional CSS selector scoping the extraction, e.g. "article" or "#content"
    #[serde(default)]
    pub selector: Option<String>,

    /// Maximum characters of text to return (default: 50000)
    #[serde(default = "default_text_max_chars")]
    pub max_chars: usize,

    #[serde(default)]
    pub session_options: Option<SessionOptions>,

    #[serde(default)]
    pub request_options: Option<RequestOptions>,
}

impl FetchTextParams {
    pub fn validate(&self) -> Result<(), Error> {
        validate_request(
            &self.url,
            self.impersonate.as_deref(),
            self.session_options.as_ref(),
            self.request_options.as_ref(),
        )?;
        if let Some(selector) = self.selector.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            parse_selector(selector)?;
        }
        require_max_chars(self.max_chars)
    }
}

pub async fn fetch_text_impl(ctx: &ToolContext, params: FetchTextParams) -> Result<CallToolResult, McpError> {
    params.validate()?;

    let options = merge_request_options(
        params.request_options,
        Overrides { impersonate: params.impersonate, ..Default::default() },
    );
    let fetcher = ctx.fetcher(params.session_options)?;
    let result = fetcher.fetch(FetchRequest::get(params.url).with_options(options)).await?;

    let text = clean_html(&result.text, params.selector.as_deref(), params.max_chars)?;
    Ok(text_result(text))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::tools::testing::{StubFetcher, context, text_of};

    const PAGE: &str = r#"<html><head><title>T</title><script>var x = 1;</script></head>
        <body><nav>Menu</nav><article><h1>Title</h1><p>First   paragraph.</p></article></body></html>"#;

    fn params(value: serde_json::Value) -> FetchTextParams {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_cleans_page() {
        let stub = Arc::new(StubFetcher::body(PAGE));
        let result = fetch_text_impl(&context(stub), params(json!({"url": "https://example.com"})))
            .await
            .unwrap();

        let text = text_of(&result);
        assert!(text.contains("Title"));
        assert!(text.contains("First paragraph."));
        assert!(!text.contains("var x"));
        assert!(!text.contains("Menu"));
    }

    #[tokio::test]
    async fn test_scoped_selector() {
        let stub = Arc::new(StubFetcher::body(PAGE));
        let result = fetch_text_impl(&context(stub), params(json!({"url": "https://example.com", "selector": "h1"})))
            .await
            .unwrap();
        assert_eq!(text_of(&result), "# Title");
    }

    #[tokio::test]
    async fn test_missing_selector_falls_back() {
        let stub = Arc::new(StubFetcher::body(PAGE));
        let result =
            fetch_text_impl(&context(stub), params(json!({"url": "https://example.com", "selector": "#missing"})))
                .await
                .unwrap();
        assert!(text_of(&result).starts_with("[selector not found: #missing]"));
    }

    #[tokio::test]
    async fn test_invalid_selector_makes_no_call() {
        let stub = Arc::new(StubFetcher::body(PAGE));
        let p = params(json!({"url": "https://example.com", "selector": "[[["}));
        let err = fetch_text_impl(&context(stub.clone()), p).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_selector_renders_whole_page() {
        let stub = Arc::new(StubFetcher::body(PAGE));
        let p = params(json!({"url": "https://example.com", "selector": " "}));
        let result = fetch_text_impl(&context(stub.clone()), p).await.unwrap();

        let text = text_of(&result);
        assert!(text.starts_with("# Title"));
        assert!(text.contains("First paragraph."));
        assert_eq!(stub.calls(), 1);
    }

    #[test]
    fn test_default_max_chars() {
        assert_eq!(params(json!({"url": "https://example.com"})).max_chars, 50_000);
    }
}
