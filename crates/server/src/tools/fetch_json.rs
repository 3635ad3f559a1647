//! fetch_json tool: GET or POST a JSON API and pretty-print the response.

use std::collections::BTreeMap;

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stealth_fetch_client::{FetchRequest, HttpMethod, RequestBody, RequestOptions, SessionOptions};
use stealth_fetch_core::{Error, truncate};

use super::{
    Overrides, ToolContext, default_max_chars, merge_request_options, require_max_chars, text_result, to_json,
    validate_request,
};

/// Line prepended when the response body is not valid JSON.
pub const NOT_JSON_WARNING: &str = "Warning: response was not valid JSON; returning raw content.";

/// HTTP methods accepted by fetch_json.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum JsonMethod {
    #[default]
    Get,
    Post,
}

impl From<JsonMethod> for HttpMethod {
    fn from(method: JsonMethod) -> Self {
        match method {
            JsonMethod::Get => HttpMethod::Get,
            JsonMethod::Post => HttpMethod::Post,
        }
    }
}

/// Parameters for the fetch_json tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FetchJsonParams {
    /// Target URL (http:// or https://)
    pub url: String,

    /// Browser to impersonate (default: chrome)
    #[serde(default)]
    pub impersonate: Option<String>,

    /// HTTP method, GET or POST (default: GET)
    #[serde(default)]
    pub method: JsonMethod,

    /// Extra request headers
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,

    /// JSON document sent as the POST body
    #[serde(default)]
    pub body: Option<String>,

    /// Maximum characters of output (default: 100000)
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    #[serde(default)]
    pub session_options: Option<SessionOptions>,

    #[serde(default)]
    pub request_options: Option<RequestOptions>,
}

impl FetchJsonParams {
    /// Validate everything and parse the POST body.
    pub fn validate(&self) -> Result<Option<Value>, Error> {
        validate_request(
            &self.url,
            self.impersonate.as_deref(),
            self.session_options.as_ref(),
            self.request_options.as_ref(),
        )?;
        require_max_chars(self.max_chars)?;

        match (&self.body, self.method) {
            (None, _) => Ok(None),
            (Some(_), JsonMethod::Get) => Err(Error::InvalidInput("body is only supported for POST requests".into())),
            (Some(raw), JsonMethod::Post) => serde_json::from_str(raw)
                .map(Some)
                .map_err(|e| Error::InvalidInput(format!("Invalid JSON body for POST request: {e}"))),
        }
    }
}

/// Pretty-print `text` when it is JSON, otherwise prefix the warning line.
pub fn render_json(text: &str) -> Result<String, Error> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => to_json(&value),
        Err(_) => Ok(format!("{NOT_JSON_WARNING}\n{text}")),
    }
}

pub async fn fetch_json_impl(ctx: &ToolContext, params: FetchJsonParams) -> Result<CallToolResult, McpError> {
    let body = params.validate()?;

    let mut options = merge_request_options(
        params.request_options,
        Overrides { impersonate: params.impersonate, headers: params.headers, ..Default::default() },
    );
    if !options.has_header("accept") {
        options.merge_headers(Some(BTreeMap::from([("accept".to_string(), "application/json".to_string())])));
    }
    let mut request = FetchRequest::get(params.url)
        .with_method(params.method.into())
        .with_options(options);
    if let Some(body) = body {
        request = request.with_body(RequestBody::Json(body));
    }

    let fetcher = ctx.fetcher(params.session_options)?;
    let result = fetcher.fetch(request).await?;

    Ok(text_result(truncate(&render_json(&result.text)?, params.max_chars)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::tools::testing::{StubFetcher, context, text_of};

    fn params(value: Value) -> FetchJsonParams {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_render_json_pretty() {
        assert_eq!(render_json(r#"{"a":[1,2]}"#).unwrap(), "{\n  \"a\": [\n    1,\n    2\n  ]\n}");
    }

    #[test]
    fn test_render_non_json() {
        let out = render_json("<html>nope</html>").unwrap();
        assert_eq!(out, format!("{NOT_JSON_WARNING}\n<html>nope</html>"));
    }

    #[tokio::test]
    async fn test_get_pretty_prints() {
        let stub = Arc::new(StubFetcher::body(r#"{"ok":true}"#));
        let result = fetch_json_impl(&context(stub.clone()), params(json!({"url": "https://api.example.com/v1"})))
            .await
            .unwrap();

        assert_eq!(text_of(&result), "{\n  \"ok\": true\n}");
        let sent = &stub.requests()[0];
        assert_eq!(sent.method, HttpMethod::Get);
        assert_eq!(sent.options.headers.as_ref().unwrap()["accept"], "application/json");
    }

    #[tokio::test]
    async fn test_caller_accept_kept() {
        let stub = Arc::new(StubFetcher::body("{}"));
        let p = params(json!({"url": "https://api.example.com", "headers": {"Accept": "application/ld+json"}}));
        fetch_json_impl(&context(stub.clone()), p).await.unwrap();

        let headers = stub.requests()[0].options.headers.clone().unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["Accept"], "application/ld+json");
    }

    #[tokio::test]
    async fn test_request_options_accept_kept() {
        let stub = Arc::new(StubFetcher::body("{}"));
        let p = params(json!({
            "url": "https://api.example.com",
            "request_options": {"headers": {"ACCEPT": "text/plain"}}
        }));
        fetch_json_impl(&context(stub.clone()), p).await.unwrap();

        let headers = stub.requests()[0].options.headers.clone().unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["ACCEPT"], "text/plain");
    }

    #[tokio::test]
    async fn test_post_sends_parsed_body() {
        let stub = Arc::new(StubFetcher::body("[]"));
        let p = params(json!({"url": "https://api.example.com/items", "method": "POST", "body": "{\"name\": \"x\"}"}));
        fetch_json_impl(&context(stub.clone()), p).await.unwrap();

        let sent = &stub.requests()[0];
        assert_eq!(sent.method, HttpMethod::Post);
        assert_eq!(sent.body, Some(RequestBody::Json(json!({"name": "x"}))));
    }

    #[tokio::test]
    async fn test_invalid_body_rejected_before_fetch() {
        let stub = Arc::new(StubFetcher::body("{}"));
        let p = params(json!({"url": "https://api.example.com", "method": "POST", "body": "{not json"}));
        let err = fetch_json_impl(&context(stub.clone()), p).await.unwrap_err();

        assert!(err.message.starts_with("Invalid JSON body for POST request:"));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_body_with_get_rejected() {
        let stub = Arc::new(StubFetcher::body("{}"));
        let p = params(json!({"url": "https://api.example.com", "body": "{}"}));
        assert!(fetch_json_impl(&context(stub.clone()), p).await.is_err());
        assert_eq!(stub.calls(), 0);
    }

    #[test]
    fn test_unknown_method_rejected() {
        let result = serde_json::from_value::<FetchJsonParams>(json!({"url": "https://a.test", "method": "DELETE"}));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_non_json_truncated() {
        let stub = Arc::new(StubFetcher::body(&"x".repeat(500)));
        let p = params(json!({"url": "https://api.example.com", "max_chars": 100}));
        let text = text_of(&fetch_json_impl(&context(stub), p).await.unwrap());

        assert!(text.starts_with(NOT_JSON_WARNING));
        assert!(text.ends_with("[truncated at 100 chars]"));
    }
}
