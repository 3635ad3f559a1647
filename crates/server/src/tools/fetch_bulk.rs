//! fetch_bulk tool: fetch many URLs concurrently with per-item isolation.

use std::time::Duration;

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stealth_fetch_client::{
    BatchOptions, FetchRequest, MAX_BATCH_CONCURRENCY, MAX_BATCH_URLS, SessionOptions, execute_batch,
};
use stealth_fetch_core::Error;

use super::{
    Overrides, ToolContext, default_timeout, merge_request_options, require_impersonate, require_range,
    require_timeout, text_result, to_json, validate_request,
};

fn default_max_concurrency() -> usize {
    5
}

fn default_max_chars_per_url() -> usize {
    10_000
}

/// One URL to fetch.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct BulkItem {
    /// Target URL (http:// or https://)
    pub url: String,
}

/// Parameters for the fetch_bulk tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FetchBulkParams {
    /// URLs to fetch (1 to 50 items)
    pub urls: Vec<BulkItem>,

    /// Browser to impersonate for every request (default: chrome)
    #[serde(default)]
    pub impersonate: Option<String>,

    /// Maximum concurrent requests (default: 5, max: 20)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Seconds to wait before each request once a slot is free (default: 0, max: 60)
    #[serde(default)]
    pub delay: f64,

    /// Per-URL timeout in seconds (default: 30, max: 300)
    #[serde(default = "default_timeout")]
    pub timeout: f64,

    /// Maximum characters of text per URL (default: 10000, max: 100000)
    #[serde(default = "default_max_chars_per_url")]
    pub max_chars_per_url: usize,

    /// Options for a dedicated transport session shared by all items of this call
    #[serde(default)]
    pub session_options: Option<SessionOptions>,
}

impl FetchBulkParams {
    pub fn validate(&self) -> Result<(), Error> {
        require_range("urls", self.urls.len(), 1, MAX_BATCH_URLS)?;
        for item in &self.urls {
            validate_request(&item.url, None, None, None)?;
        }
        if let Some(name) = &self.impersonate {
            require_impersonate(name)?;
        }
        if let Some(session) = &self.session_options {
            session.validate()?;
        }
        require_range("max_concurrency", self.max_concurrency, 1, MAX_BATCH_CONCURRENCY)?;
        if !(0.0..=60.0).contains(&self.delay) {
            return Err(Error::InvalidInput(format!("delay must be between 0 and 60 seconds, got {}", self.delay)));
        }
        require_timeout("timeout", self.timeout)?;
        require_range("max_chars_per_url", self.max_chars_per_url, 1, 100_000)
    }
}

pub async fn fetch_bulk_impl(ctx: &ToolContext, params: FetchBulkParams) -> Result<CallToolResult, McpError> {
    params.validate()?;

    let options = merge_request_options(
        None,
        Overrides { impersonate: params.impersonate, timeout: Some(params.timeout), ..Default::default() },
    );
    let batch = BatchOptions {
        max_concurrency: params.max_concurrency,
        delay: Duration::from_secs_f64(params.delay),
        timeout: Some(Duration::from_secs_f64(params.timeout)),
        max_chars_per_url: params.max_chars_per_url,
    };
    let fetcher = ctx.fetcher(params.session_options)?;
    let urls = params.urls.into_iter().map(|item| item.url).collect();

    let outcomes = execute_batch(urls, &batch, move |url| {
        let fetcher = fetcher.clone();
        let request = FetchRequest::get(url).with_options(options.clone());
        async move { fetcher.fetch(request).await }
    })
    .await?;

    Ok(text_result(to_json(&outcomes)?))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, json};
    use stealth_fetch_client::fetch::TimeoutSpec;

    use super::*;
    use crate::tools::testing::{StubFetcher, context, text_of};

    fn params(value: Value) -> FetchBulkParams {
        serde_json::from_value(value).unwrap()
    }

    fn items(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!({"url": format!("https://site.test/{i}")})).collect()
    }

    #[test]
    fn test_defaults() {
        let p = params(json!({"urls": items(1)}));
        assert_eq!(p.max_concurrency, 5);
        assert_eq!(p.delay, 0.0);
        assert_eq!(p.timeout, 30.0);
        assert_eq!(p.max_chars_per_url, 10_000);
    }

    #[tokio::test]
    async fn test_mixed_outcomes_in_order() {
        let stub = Arc::new(
            StubFetcher::body("fine")
                .route("https://site.test/1", Err(Error::timeout()))
                .route("https://site.test/2", Ok(&"y".repeat(40))),
        );
        let p = params(json!({"urls": items(3), "max_chars_per_url": 10, "impersonate": "safari"}));
        let result = fetch_bulk_impl(&context(stub.clone()), p).await.unwrap();

        let outcomes: Vec<Value> = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0], json!({
            "status": "ok", "url": "https://site.test/0", "status_code": 200,
            "final_url": "https://site.test/0", "text": "fine"
        }));
        assert_eq!(outcomes[1], json!({
            "status": "error", "url": "https://site.test/1",
            "error": "Request timed out. Try increasing the timeout value."
        }));
        assert_eq!(outcomes[2]["text"], format!("{}\n[truncated at 10 chars]", "y".repeat(10)));

        let requests = stub.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|r| r.options.impersonate.as_deref() == Some("safari")));
        assert!(requests.iter().all(|r| r.options.timeout == Some(TimeoutSpec::Total(30.0))));
    }

    #[tokio::test]
    async fn test_duplicates_each_fetched() {
        let stub = Arc::new(StubFetcher::body("x"));
        let p = params(json!({"urls": [{"url": "https://a.test"}, {"url": "https://a.test"}]}));
        let result = fetch_bulk_impl(&context(stub.clone()), p).await.unwrap();

        let outcomes: Vec<Value> = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn test_batch_validation_makes_no_calls() {
        let stub = Arc::new(StubFetcher::body("x"));
        let ctx = context(stub.clone());
        for case in [
            json!({"urls": []}),
            json!({"urls": items(51)}),
            json!({"urls": items(2), "max_concurrency": 0}),
            json!({"urls": items(2), "max_concurrency": 21}),
            json!({"urls": items(2), "delay": -1}),
            json!({"urls": items(2), "delay": 61}),
            json!({"urls": items(2), "timeout": 0}),
            json!({"urls": items(2), "max_chars_per_url": 100_001}),
            json!({"urls": items(2), "impersonate": "lynx"}),
            json!({"urls": [{"url": "https://ok.test"}, {"url": "gopher://old.test"}]}),
        ] {
            let err = fetch_bulk_impl(&ctx, params(case.clone())).await.unwrap_err();
            assert_eq!(err.code.0, -32602, "{case}");
        }
        assert_eq!(stub.calls(), 0);
    }

    #[test]
    fn test_request_options_not_accepted() {
        let result = serde_json::from_value::<FetchBulkParams>(json!({"urls": items(1), "request_options": {}}));
        assert!(result.is_err());
    }
}
