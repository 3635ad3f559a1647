//! MCP tool implementations.
//!
//! This module contains all tools exposed by the stealth-fetch server along
//! with the validation and option-merging helpers they share. Every tool
//! validates its parameters completely before issuing a transport call.

pub mod extract_links;
pub mod extract_metadata;
pub mod extract_tables;
pub mod fetch_bulk;
pub mod fetch_feed;
pub mod fetch_headers;
pub mod fetch_json;
pub mod fetch_page;
pub mod fetch_robots;
pub mod fetch_text;

use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use stealth_fetch_client::fetch::TimeoutSpec;
use stealth_fetch_client::{FetchClient, FetchConfig, Fetcher, RequestOptions, SessionOptions, parse_http_url};
use stealth_fetch_core::{Error, Impersonate};

/// Default character cap for tool output.
pub const DEFAULT_MAX_CHARS: usize = 100_000;

/// Upper bound accepted for any `max_chars` parameter.
pub const MAX_CHARS_LIMIT: usize = 1_000_000;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: f64 = 30.0;

pub(crate) fn default_max_chars() -> usize {
    DEFAULT_MAX_CHARS
}

pub(crate) fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT_SECS
}

pub(crate) fn default_true() -> bool {
    true
}

/// Shared state handed to every tool call.
///
/// Holds the long-lived transport and the configuration needed to build a
/// per-call transport when a caller supplies `session_options`.
#[derive(Clone)]
pub struct ToolContext {
    config: FetchConfig,
    shared: Arc<dyn Fetcher>,
}

impl ToolContext {
    /// Build the context with a reqwest-backed shared transport.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let shared = Arc::new(FetchClient::new(config.clone())?);
        Ok(Self { config, shared })
    }

    /// Build the context around an existing transport.
    pub fn with_fetcher(config: FetchConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { config, shared: fetcher }
    }

    /// The transport for one tool call: the shared one, or a dedicated
    /// session when `session` is supplied.
    pub fn fetcher(&self, session: Option<SessionOptions>) -> Result<Arc<dyn Fetcher>, Error> {
        match session {
            None => Ok(self.shared.clone()),
            Some(session) => {
                tracing::debug!("building per-call transport session");
                Ok(Arc::new(FetchClient::with_session(self.config.clone(), session)?))
            }
        }
    }
}

/// Tool-level parameters that override the same keys in `request_options`.
#[derive(Debug, Clone, Default)]
pub(crate) struct Overrides {
    pub impersonate: Option<String>,
    pub headers: Option<BTreeMap<String, String>>,
    pub timeout: Option<f64>,
    pub follow_redirects: Option<bool>,
}

/// Merge tool-level parameters over caller `request_options`.
///
/// Scalars replace the request option; headers merge per key with the
/// tool-level value winning.
pub(crate) fn merge_request_options(base: Option<RequestOptions>, overrides: Overrides) -> RequestOptions {
    let mut merged = base.unwrap_or_default();
    if let Some(impersonate) = overrides.impersonate {
        merged.impersonate = Some(impersonate);
    }
    merged.merge_headers(overrides.headers);
    if let Some(timeout) = overrides.timeout {
        merged.timeout = Some(TimeoutSpec::Total(timeout));
    }
    if let Some(follow) = overrides.follow_redirects {
        merged.allow_redirects = Some(follow);
    }
    merged
}

/// Validate the URL plus any supplied transport options.
pub(crate) fn validate_request(
    url: &str, impersonate: Option<&str>, session: Option<&SessionOptions>, request: Option<&RequestOptions>,
) -> Result<(), Error> {
    parse_http_url(url)?;
    if let Some(name) = impersonate {
        require_impersonate(name)?;
    }
    if let Some(session) = session {
        session.validate()?;
    }
    if let Some(request) = request {
        request.validate()?;
    }
    Ok(())
}

pub(crate) fn require_impersonate(name: &str) -> Result<(), Error> {
    name.parse::<Impersonate>().map(drop).map_err(|e| Error::InvalidInput(e.to_string()))
}

/// Inclusive range check with a uniform message.
pub(crate) fn require_range<T: PartialOrd + Display>(field: &str, value: T, min: T, max: T) -> Result<(), Error> {
    if value < min || value > max {
        return Err(Error::InvalidInput(format!("{field} must be between {min} and {max}, got {value}")));
    }
    Ok(())
}

/// Timeouts must be positive and at most 300 seconds.
pub(crate) fn require_timeout(field: &str, secs: f64) -> Result<(), Error> {
    if !(secs > 0.0 && secs <= 300.0) {
        return Err(Error::InvalidInput(format!("{field} must be greater than 0 and at most 300 seconds")));
    }
    Ok(())
}

pub(crate) fn require_max_chars(max_chars: usize) -> Result<(), Error> {
    require_range("max_chars", max_chars, 1, MAX_CHARS_LIMIT)
}

/// Pretty-print a value as the tool's JSON output.
pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String, Error> {
    serde_json::to_string_pretty(value).map_err(|e| Error::Internal(format!("failed to serialize output: {e}")))
}

pub(crate) fn text_result(text: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text)])
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory transport for tool tests.

    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use rmcp::model::CallToolResult;
    use stealth_fetch_client::{FetchConfig, FetchRequest, FetchResult, Fetcher};
    use stealth_fetch_core::Error;

    use super::ToolContext;

    /// Returns canned bodies and records every request it receives.
    pub struct StubFetcher {
        default: Result<String, Error>,
        routes: HashMap<String, Result<String, Error>>,
        headers: BTreeMap<String, String>,
        calls: AtomicUsize,
        requests: Mutex<Vec<FetchRequest>>,
    }

    impl StubFetcher {
        pub fn body(body: &str) -> Self {
            Self {
                default: Ok(body.to_string()),
                routes: HashMap::new(),
                headers: BTreeMap::from([("content-type".to_string(), "text/html".to_string())]),
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(err: Error) -> Self {
            Self { default: Err(err), ..Self::body("") }
        }

        pub fn route(mut self, url: &str, result: Result<&str, Error>) -> Self {
            self.routes.insert(url.to_string(), result.map(str::to_string));
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn requests(&self) -> Vec<FetchRequest> {
            self.requests.lock().map(|r| r.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, request: FetchRequest) -> Result<FetchResult, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request.clone());
            }
            let outcome = self.routes.get(&request.url).cloned().unwrap_or_else(|| self.default.clone());
            outcome.map(|text| FetchResult {
                status_code: 200,
                final_url: request.url.clone(),
                text,
                headers: self.headers.clone(),
            })
        }
    }

    pub fn context(stub: std::sync::Arc<StubFetcher>) -> ToolContext {
        ToolContext::with_fetcher(FetchConfig::default(), stub)
    }

    /// The single text item of a tool result.
    pub fn text_of(result: &CallToolResult) -> String {
        result.content.first().and_then(|c| c.as_text()).map(|t| t.text.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_request_options_overrides() {
        let base = RequestOptions {
            impersonate: Some("safari".into()),
            timeout: Some(TimeoutSpec::Total(5.0)),
            allow_redirects: Some(true),
            headers: Some(BTreeMap::from([
                ("x-a".to_string(), "base".to_string()),
                ("x-b".to_string(), "base".to_string()),
            ])),
            ..Default::default()
        };
        let merged = merge_request_options(
            Some(base),
            Overrides {
                impersonate: Some("firefox".into()),
                headers: Some(BTreeMap::from([("x-b".to_string(), "tool".to_string())])),
                timeout: Some(12.0),
                follow_redirects: Some(false),
            },
        );

        assert_eq!(merged.impersonate.as_deref(), Some("firefox"));
        assert_eq!(merged.timeout, Some(TimeoutSpec::Total(12.0)));
        assert_eq!(merged.allow_redirects, Some(false));
        let headers = merged.headers.unwrap();
        assert_eq!(headers["x-a"], "base");
        assert_eq!(headers["x-b"], "tool");
    }

    #[test]
    fn test_merge_keeps_unset_values() {
        let base = RequestOptions { impersonate: Some("edge101".into()), ..Default::default() };
        let merged = merge_request_options(Some(base), Overrides::default());
        assert_eq!(merged.impersonate.as_deref(), Some("edge101"));
        assert!(merged.timeout.is_none());
    }

    #[test]
    fn test_require_range() {
        assert!(require_range("n", 1, 1, 10).is_ok());
        assert!(require_range("n", 10, 1, 10).is_ok());
        assert!(require_range("n", 0, 1, 10).is_err());
        assert!(require_range("n", 11, 1, 10).is_err());
    }

    #[test]
    fn test_require_timeout() {
        assert!(require_timeout("timeout", 300.0).is_ok());
        assert!(require_timeout("timeout", 0.0).is_err());
        assert!(require_timeout("timeout", -1.0).is_err());
        assert!(require_timeout("timeout", 300.1).is_err());
        assert!(require_timeout("timeout", f64::NAN).is_err());
    }

    #[test]
    fn test_validate_request_rejects_non_http() {
        let err = validate_request("file:///etc/hosts", None, None, None).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn test_validate_request_rejects_unknown_impersonate() {
        assert!(validate_request("https://example.com", Some("ie6"), None, None).is_err());
    }

    #[tokio::test]
    async fn test_context_builds_session_transport() {
        let ctx = ToolContext::new(FetchConfig::default()).unwrap();
        assert!(ctx.fetcher(None).is_ok());
        assert!(ctx.fetcher(Some(SessionOptions::default())).is_ok());

        let bad = SessionOptions { max_clients: Some(0), ..Default::default() };
        assert!(matches!(ctx.fetcher(Some(bad)), Err(Error::InvalidInput(_))));
    }
}
