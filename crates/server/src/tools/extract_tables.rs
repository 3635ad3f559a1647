//! extract_tables tool: HTML tables as header and row lists.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stealth_fetch_client::{FetchRequest, RequestOptions, SessionOptions, extract_tables, parse_selector};
use stealth_fetch_core::{Error, truncate};

use super::{
    Overrides, ToolContext, default_max_chars, merge_request_options, require_max_chars, text_result, to_json,
    validate_request,
};

/// Parameters for the extract_tables tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ExtractTablesParams {
    /// Page URL (http:// or https://)
    pub url: String,

    /// Browser to impersonate (default: chrome)
    #[serde(default)]
    pub impersonate: Option<String>,

    /// CSS selector for tables or for containers holding tables
    #[serde(default)]
    pub selector: Option<String>,

    /// Maximum characters of output (default: 100000)
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    #[serde(default)]
    pub session_options: Option<SessionOptions>,

    #[serde(default)]
    pub request_options: Option<RequestOptions>,
}

impl ExtractTablesParams {
    pub fn validate(&self) -> Result<(), Error> {
        validate_request(
            &self.url,
            self.impersonate.as_deref(),
            self.session_options.as_ref(),
            self.request_options.as_ref(),
        )?;
        if let Some(selector) = &self.selector {
            parse_selector(selector)?;
        }
        require_max_chars(self.max_chars)
    }
}

pub async fn extract_tables_impl(ctx: &ToolContext, params: ExtractTablesParams) -> Result<CallToolResult, McpError> {
    params.validate()?;
    let selector = params.selector.as_deref().map(parse_selector).transpose()?;

    let options = merge_request_options(
        params.request_options,
        Overrides { impersonate: params.impersonate, ..Default::default() },
    );
    let fetcher = ctx.fetcher(params.session_options)?;
    let result = fetcher.fetch(FetchRequest::get(params.url).with_options(options)).await?;

    let tables = extract_tables(&result.text, selector.as_ref());
    Ok(text_result(truncate(&to_json(&tables)?, params.max_chars)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, json};

    use super::*;
    use crate::tools::testing::{StubFetcher, context, text_of};

    const PAGE: &str = r#"<html><body>
        <table id="prices">
          <thead><tr><th>Item</th><th>Price</th></tr></thead>
          <tbody><tr><td>Tea</td><td>3</td></tr><tr><td>Cake</td><td>5</td></tr></tbody>
        </table>
        <section class="other"><table><tr><td>lonely</td></tr></table></section>
    </body></html>"#;

    fn params(value: Value) -> ExtractTablesParams {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_all_tables() {
        let stub = Arc::new(StubFetcher::body(PAGE));
        let result = extract_tables_impl(&context(stub), params(json!({"url": "https://example.com"})))
            .await
            .unwrap();

        let tables: Value = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(tables.as_array().unwrap().len(), 2);
        assert_eq!(tables[0]["headers"], json!(["Item", "Price"]));
        assert_eq!(tables[0]["rows"], json!([["Tea", "3"], ["Cake", "5"]]));
        assert_eq!(tables[1]["headers"], json!([]));
        assert_eq!(tables[1]["rows"], json!([["lonely"]]));
    }

    #[tokio::test]
    async fn test_scoped_selector() {
        let stub = Arc::new(StubFetcher::body(PAGE));
        let p = params(json!({"url": "https://example.com", "selector": ".other"}));
        let result = extract_tables_impl(&context(stub), p).await.unwrap();

        let tables: Value = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(tables, json!([{"headers": [], "rows": [["lonely"]]}]));
    }

    #[tokio::test]
    async fn test_invalid_selector_makes_no_call() {
        let stub = Arc::new(StubFetcher::body(PAGE));
        let p = params(json!({"url": "https://example.com", "selector": "table:::"}));
        assert!(extract_tables_impl(&context(stub.clone()), p).await.is_err());
        assert_eq!(stub.calls(), 0);
    }
}
