//! fetch_headers tool: status, final URL and response headers.

use std::collections::BTreeMap;

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stealth_fetch_client::{FetchRequest, RequestOptions, SessionOptions};
use stealth_fetch_core::Error;

use super::{
    Overrides, ToolContext, default_timeout, default_true, merge_request_options, require_timeout, text_result,
    to_json, validate_request,
};

/// Parameters for the fetch_headers tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FetchHeadersParams {
    /// Target URL (http:// or https://)
    pub url: String,

    /// Browser to impersonate (default: chrome)
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

    #[serde(default)]
    pub session_options: Option<SessionOptions>,

    #[serde(default)]
    pub request_options: Option<RequestOptions>,
}

impl FetchHeadersParams {
    pub fn validate(&self) -> Result<(), Error> {
        validate_request(
            &self.url,
            self.impersonate.as_deref(),
            self.session_options.as_ref(),
            self.request_options.as_ref(),
        )?;
        require_timeout("timeout", self.timeout)
    }
}

#[derive(Debug, Serialize)]
struct HeadersOutput {
    status_code: u16,
    final_url: String,
    headers: BTreeMap<String, String>,
}

pub async fn fetch_headers_impl(ctx: &ToolContext, params: FetchHeadersParams) -> Result<CallToolResult, McpError> {
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

    let output =
        HeadersOutput { status_code: result.status_code, final_url: result.final_url, headers: result.headers };
    Ok(text_result(to_json(&output)?))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, json};

    use super::*;
    use crate::tools::testing::{StubFetcher, context, text_of};

    fn params(value: Value) -> FetchHeadersParams {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_reports_headers() {
        let stub = Arc::new(StubFetcher::body("ignored body"));
        let result = fetch_headers_impl(&context(stub.clone()), params(json!({"url": "https://example.com/a"})))
            .await
            .unwrap();

        let out: Value = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(out["status_code"], 200);
        assert_eq!(out["final_url"], "https://example.com/a");
        assert_eq!(out["headers"]["content-type"], "text/html");
        assert!(out.get("text").is_none());
        assert_eq!(stub.requests()[0].options.allow_redirects, Some(true));
    }

    #[tokio::test]
    async fn test_no_follow_passed_through() {
        let stub = Arc::new(StubFetcher::body(""));
        let p = params(json!({"url": "https://example.com/a", "follow_redirects": false}));
        fetch_headers_impl(&context(stub.clone()), p).await.unwrap();
        assert_eq!(stub.requests()[0].options.allow_redirects, Some(false));
    }

    #[tokio::test]
    async fn test_bad_timeout_makes_no_call() {
        let stub = Arc::new(StubFetcher::body(""));
        let p = params(json!({"url": "https://example.com", "timeout": 500}));
        assert!(fetch_headers_impl(&context(stub.clone()), p).await.is_err());
        assert_eq!(stub.calls(), 0);
    }
}
