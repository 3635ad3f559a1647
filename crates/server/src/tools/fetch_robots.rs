//! fetch_robots tool: a site's robots.txt as structured groups.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stealth_fetch_client::{FetchRequest, RequestOptions, SessionOptions, parse_http_url, parse_robots_txt, robots_url};
use stealth_fetch_core::Error;

use super::{Overrides, ToolContext, merge_request_options, text_result, to_json, validate_request};

/// Parameters for the fetch_robots tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FetchRobotsParams {
    /// Any URL on the site; its robots.txt is fetched
    pub url: String,

    /// Browser to impersonate (default: chrome)
    #[serde(default)]
    pub impersonate: Option<String>,

    #[serde(default)]
    pub session_options: Option<SessionOptions>,

    #[serde(default)]
    pub request_options: Option<RequestOptions>,
}

impl FetchRobotsParams {
    pub fn validate(&self) -> Result<(), Error> {
        validate_request(
            &self.url,
            self.impersonate.as_deref(),
            self.session_options.as_ref(),
            self.request_options.as_ref(),
        )
    }
}

pub async fn fetch_robots_impl(ctx: &ToolContext, params: FetchRobotsParams) -> Result<CallToolResult, McpError> {
    params.validate()?;
    let target = robots_url(&parse_http_url(&params.url).map_err(Error::from)?);

    let options = merge_request_options(
        params.request_options,
        Overrides { impersonate: params.impersonate, ..Default::default() },
    );
    let fetcher = ctx.fetcher(params.session_options)?;
    let result = fetcher.fetch(FetchRequest::get(target.as_str()).with_options(options)).await?;

    let robots = parse_robots_txt(target.as_str(), &result.text);
    Ok(text_result(to_json(&robots)?))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, json};

    use super::*;
    use crate::tools::testing::{StubFetcher, context, text_of};

    const ROBOTS: &str = "User-agent: *\nDisallow: /admin\nSitemap: https://site.test/sitemap.xml\n";

    #[tokio::test]
    async fn test_fetches_site_robots() {
        let stub = Arc::new(StubFetcher::body(ROBOTS));
        let p: FetchRobotsParams =
            serde_json::from_value(json!({"url": "https://site.test/deep/page?q=1#frag"})).unwrap();
        let result = fetch_robots_impl(&context(stub.clone()), p).await.unwrap();

        assert_eq!(stub.requests()[0].url, "https://site.test/robots.txt");
        let robots: Value = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(robots["url"], "https://site.test/robots.txt");
        assert_eq!(robots["sitemaps"], json!(["https://site.test/sitemap.xml"]));
        assert_eq!(robots["groups"][0]["disallow"], json!(["/admin"]));
    }

    #[tokio::test]
    async fn test_missing_robots_propagates_status() {
        let stub = Arc::new(StubFetcher::failing(Error::http_status(404, "")));
        let p: FetchRobotsParams = serde_json::from_value(json!({"url": "https://site.test/"})).unwrap();
        let err = fetch_robots_impl(&context(stub), p).await.unwrap_err();
        assert_eq!(err.message, "HTTP 404 error.");
    }
}
