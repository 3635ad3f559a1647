//! HTTP transport with browser impersonation and layered options.
//!
//! ### Option layering
//! - App config (`FetchConfig`) forms the base of every request.
//! - `SessionOptions` apply to every request made through one client.
//! - `RequestOptions` apply to a single request and win over the session.
//!
//! ### Header precedence (later wins)
//! 1. Impersonation profile headers (unless `default_headers=false`)
//! 2. Config base headers and `user_agent`
//! 3. Session headers
//! 4. Request headers
//! 5. `referer` / `accept_encoding` shortcuts
//!
//! ### Failure mapping
//! - Deadline exceeded → `FetchTimeout`
//! - TLS handshake/certificate → `TlsFailed`
//! - DNS/TCP → `ConnectionFailed`
//! - Status >= 400 → `HttpStatus` with a 300-char body snippet
//! - Body over `max_bytes` → `FetchTooLarge`

pub mod options;
pub mod profile;
pub mod url;

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Proxy, redirect};
use serde::{Deserialize, Serialize};
use stealth_fetch_core::error::{CONNECTION_MESSAGE, TLS_MESSAGE};
use stealth_fetch_core::{AppConfig, Error, Impersonate, truncate};

pub use options::{
    CertCompression, ClientCert, Credentials, ExtraFingerprint, FormData, HttpVersion, QueryParams, RequestOptions,
    SessionOptions, TimeoutSpec, Verify,
};
pub use self::url::{UrlError, parse_http_url, resolve_href, robots_url};

/// Characters of the response body carried in an HTTP status error.
const ERROR_SNIPPET_CHARS: usize = 300;

/// Configuration for the fetch client, derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Default impersonation target (default: chrome)
    pub impersonate: Impersonate,

    /// User agent override; when unset the impersonation profile decides
    pub user_agent: Option<String>,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 30s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 10)
    pub max_redirects: usize,

    /// Proxy applied to every request
    pub proxy: Option<String>,

    /// Whether TLS certificates are verified (default: true)
    pub verify_tls: bool,

    /// Base headers sent with every request
    pub headers: BTreeMap<String, String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            impersonate: config.impersonate_target(),
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
            proxy: config.proxy.clone(),
            verify_tls: config.verify_tls,
            headers: config.headers.clone(),
        }
    }
}

/// HTTP methods a tool may issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Options,
    Head,
    Patch,
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Options => Method::OPTIONS,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Patch => Method::PATCH,
        }
    }
}

/// Request body supplied by a tool rather than through `request_options`.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Text(String),
}

/// A single transport call.
#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    pub url: String,
    pub method: HttpMethod,
    pub body: Option<RequestBody>,
    pub options: RequestOptions,
}

impl FetchRequest {
    /// A plain GET with no per-request options.
    pub fn get(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Default::default() }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchResult {
    /// HTTP status code
    pub status_code: u16,
    /// The final URL after redirects
    pub final_url: String,
    /// Decoded response body
    pub text: String,
    /// Response headers; repeated headers joined with ", "
    pub headers: BTreeMap<String, String>,
}

/// Anything that can perform one HTTP request.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResult, Error>;
}

/// Settings that live on the reqwest client rather than on a request.
#[derive(Debug, Clone)]
struct ClientSettings {
    follow_redirects: bool,
    max_redirects: Option<usize>,
    proxy: Option<String>,
    proxies: BTreeMap<String, String>,
    proxy_auth: Option<Credentials>,
    trust_env: bool,
    verify: Verify,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    http_version: Option<HttpVersion>,
    interface: Option<String>,
    cert: Option<ClientCert>,
    max_clients: Option<usize>,
}

impl ClientSettings {
    fn new(config: &FetchConfig, session: &SessionOptions) -> Self {
        let (connect_timeout, read_timeout) = match session.timeout {
            Some(TimeoutSpec::Split(connect, read)) => {
                (Some(Duration::from_secs_f64(connect)), Some(Duration::from_secs_f64(read)))
            }
            _ => (None, None),
        };
        Self {
            follow_redirects: session.allow_redirects.unwrap_or(true),
            max_redirects: session.max_redirects.map(redirect_limit).unwrap_or(Some(config.max_redirects)),
            proxy: session.proxy.clone().or_else(|| config.proxy.clone()),
            proxies: session.proxies.clone().unwrap_or_default(),
            proxy_auth: session.proxy_auth.clone(),
            trust_env: session.trust_env.unwrap_or(true),
            verify: session.verify.clone().unwrap_or(Verify::Enabled(config.verify_tls)),
            connect_timeout,
            read_timeout,
            http_version: session.http_version,
            interface: session.interface.clone(),
            cert: session.cert.clone(),
            max_clients: session.max_clients,
        }
    }

    /// Layer request-level client settings over these.
    fn with_request(&self, opts: &RequestOptions, follow_redirects: bool) -> Self {
        let mut settings = self.clone();
        settings.follow_redirects = follow_redirects;
        if let Some(max) = opts.max_redirects {
            settings.max_redirects = redirect_limit(max);
        }
        if opts.proxy.is_some() || opts.proxies.is_some() {
            settings.proxy = opts.proxy.clone();
            settings.proxies = opts.proxies.clone().unwrap_or_default();
        }
        if let Some(auth) = &opts.proxy_auth {
            settings.proxy_auth = Some(auth.clone());
        }
        if let Some(verify) = &opts.verify {
            settings.verify = verify.clone();
        }
        if opts.http_version.is_some() {
            settings.http_version = opts.http_version;
        }
        if let Some(interface) = &opts.interface {
            settings.interface = Some(interface.clone());
        }
        if let Some(cert) = &opts.cert {
            settings.cert = Some(cert.clone());
        }
        settings
    }

    fn build(&self) -> Result<Client, Error> {
        let policy = match (self.follow_redirects, self.max_redirects) {
            (false, _) | (true, Some(0)) => redirect::Policy::none(),
            (true, Some(max)) => redirect::Policy::limited(max),
            (true, None) => redirect::Policy::limited(usize::MAX),
        };

        let mut builder = Client::builder()
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .redirect(policy);

        if let Some(connect) = self.connect_timeout {
            builder = builder.connect_timeout(connect);
        }
        if let Some(read) = self.read_timeout {
            builder = builder.read_timeout(read);
        }

        if !self.trust_env {
            builder = builder.no_proxy();
        }
        for proxy in self.proxies()? {
            builder = builder.proxy(proxy);
        }

        match &self.verify {
            Verify::Enabled(true) => {}
            Verify::Enabled(false) => builder = builder.danger_accept_invalid_certs(true),
            Verify::CaBundle(path) => {
                let pem = std::fs::read(path)
                    .map_err(|e| Error::InvalidInput(format!("failed to read CA bundle {path}: {e}")))?;
                for cert in reqwest::Certificate::from_pem_bundle(&pem)
                    .map_err(|e| Error::InvalidInput(format!("invalid CA bundle {path}: {e}")))?
                {
                    builder = builder.add_root_certificate(cert);
                }
            }
        }

        match self.http_version {
            Some(HttpVersion::V1) => builder = builder.http1_only(),
            Some(HttpVersion::V2PriorKnowledge) => builder = builder.http2_prior_knowledge(),
            Some(HttpVersion::V3 | HttpVersion::V3only) => {
                return Err(Error::InvalidInput("HTTP/3 is not supported by this transport".into()));
            }
            Some(HttpVersion::V2 | HttpVersion::V2tls) | None => {}
        }

        if let Some(interface) = &self.interface {
            let addr: IpAddr = interface
                .parse()
                .map_err(|_| Error::InvalidInput(format!("interface must be a source IP address, got {interface}")))?;
            builder = builder.local_address(addr);
        }

        if let Some(cert) = &self.cert {
            builder = builder.identity(load_identity(cert)?);
        }

        if let Some(max) = self.max_clients {
            builder = builder.pool_max_idle_per_host(max);
        }

        builder
            .build()
            .map_err(|e| Error::InvalidInput(format!("failed to build HTTP client: {e}")))
    }

    fn proxies(&self) -> Result<Vec<Proxy>, Error> {
        let mut proxies = Vec::new();
        let invalid = |e: reqwest::Error| Error::InvalidInput(format!("invalid proxy: {e}"));
        if let Some(all) = &self.proxy {
            proxies.push(Proxy::all(all).map_err(invalid)?);
        }
        for (scheme, target) in &self.proxies {
            let proxy = match scheme.as_str() {
                "http" => Proxy::http(target),
                "https" => Proxy::https(target),
                _ => Proxy::all(target),
            };
            proxies.push(proxy.map_err(invalid)?);
        }
        Ok(match &self.proxy_auth {
            Some((user, pass)) => proxies.into_iter().map(|p| p.basic_auth(user, pass)).collect(),
            None => proxies,
        })
    }
}

/// `-1` means unlimited.
fn redirect_limit(max: i64) -> Option<usize> {
    usize::try_from(max).ok()
}

fn load_identity(cert: &ClientCert) -> Result<reqwest::Identity, Error> {
    let read = |path: &str| {
        std::fs::read(path).map_err(|e| Error::InvalidInput(format!("failed to read client cert {path}: {e}")))
    };
    let pem = match cert {
        ClientCert::Combined(path) => read(path)?,
        ClientCert::Pair(cert_path, key_path) => {
            let mut pem = read(cert_path)?;
            pem.push(b'\n');
            pem.extend(read(key_path)?);
            pem
        }
    };
    reqwest::Identity::from_pem(&pem).map_err(|e| Error::InvalidInput(format!("invalid client cert: {e}")))
}

/// HTTP fetch client with browser impersonation.
pub struct FetchClient {
    config: FetchConfig,
    session: SessionOptions,
    settings: ClientSettings,
    follow: Client,
    no_follow: Client,
}

impl FetchClient {
    /// Create a fetch client with no session-level options.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        Self::with_session(config, SessionOptions::default())
    }

    /// Create a fetch client whose every request carries `session`.
    pub fn with_session(config: FetchConfig, session: SessionOptions) -> Result<Self, Error> {
        session.validate()?;
        let settings = ClientSettings::new(&config, &session);

        let follow = ClientSettings { follow_redirects: true, ..settings.clone() }.build()?;
        let no_follow = ClientSettings { follow_redirects: false, ..settings.clone() }.build()?;

        Ok(Self { config, session, settings, follow, no_follow })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Get reference to the session options.
    pub fn session(&self) -> &SessionOptions {
        &self.session
    }

    fn impersonate_for(&self, opts: &RequestOptions) -> Result<Impersonate, Error> {
        match opts.impersonate.as_deref().or(self.session.impersonate.as_deref()) {
            Some(name) => name.parse::<Impersonate>().map_err(|e| Error::InvalidInput(e.to_string())),
            None => Ok(self.config.impersonate.clone()),
        }
    }

    /// Assemble request headers in precedence order.
    pub(crate) fn request_headers(&self, opts: &RequestOptions) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();

        if opts.default_headers.or(self.session.default_headers).unwrap_or(true) {
            let target = self.impersonate_for(opts)?;
            for (name, value) in profile::browser_headers(target.family()) {
                insert_header(&mut headers, name, value)?;
            }
        }

        if let Some(ua) = &self.config.user_agent {
            insert_header(&mut headers, header::USER_AGENT.as_str(), ua)?;
        }

        let layers = [Some(&self.config.headers), self.session.headers.as_ref(), opts.headers.as_ref()];
        for (name, value) in layers.into_iter().flatten().flatten() {
            insert_header(&mut headers, name, value)?;
        }

        if let Some(referer) = &opts.referer {
            insert_header(&mut headers, header::REFERER.as_str(), referer)?;
        }
        if let Some(encoding) = &opts.accept_encoding {
            insert_header(&mut headers, header::ACCEPT_ENCODING.as_str(), encoding)?;
        }

        let mut cookies: BTreeMap<&str, &str> = BTreeMap::new();
        for (name, value) in [self.session.cookies.as_ref(), opts.cookies.as_ref()].into_iter().flatten().flatten() {
            cookies.insert(name, value);
        }
        if !cookies.is_empty() {
            let jar = cookies.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("; ");
            let value = match headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) {
                Some(existing) if !existing.is_empty() => format!("{existing}; {jar}"),
                _ => jar,
            };
            insert_header(&mut headers, header::COOKIE.as_str(), &value)?;
        }

        Ok(headers)
    }

    fn request_timeout(&self, opts: &RequestOptions) -> Duration {
        opts.timeout
            .or(self.session.timeout)
            .map(|t| Duration::from_secs_f64(t.total_secs()))
            .unwrap_or(self.config.timeout)
    }

    fn log_fingerprint(&self, url: &::url::Url, opts: &RequestOptions) {
        if opts.has_fingerprint() || self.session.has_fingerprint() {
            let ja3 = opts.ja3.as_deref().or(self.session.ja3.as_deref());
            let akamai = opts.akamai.as_deref().or(self.session.akamai.as_deref());
            let extra_fp = opts.extra_fp.is_some() || self.session.extra_fp.is_some();
            tracing::debug!(%url, ?ja3, ?akamai, extra_fp, "fingerprint overrides forwarded to transport");
        }
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    /// Perform one request; no retries.
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResult, Error> {
        let start = Instant::now();
        let opts = &request.options;
        opts.validate()?;

        let mut url = parse_http_url(&request.url)?;
        {
            let pairs: Vec<(String, String)> = [self.session.params.as_ref(), opts.params.as_ref()]
                .into_iter()
                .flatten()
                .flat_map(QueryParams::pairs)
                .collect();
            if !pairs.is_empty() {
                url.query_pairs_mut().extend_pairs(pairs);
            }
        }

        let follow = opts.allow_redirects.or(self.session.allow_redirects).unwrap_or(true);
        let http = if opts.needs_dedicated_client() {
            self.settings.with_request(opts, follow).build()?
        } else if follow {
            self.follow.clone()
        } else {
            self.no_follow.clone()
        };

        let mut builder = http
            .request(request.method.into(), url.clone())
            .headers(self.request_headers(opts)?)
            .timeout(self.request_timeout(opts));

        if let Some((user, pass)) = opts.auth.as_ref().or(self.session.auth.as_ref()) {
            builder = builder.basic_auth(user, Some(pass));
        }

        builder = match (&opts.json_body, &opts.data, &request.body) {
            (Some(json), _, _) => builder.json(json),
            (None, Some(FormData::Text(text)), _) => builder.body(text.clone()),
            (None, Some(FormData::Map(map)), _) => builder.form(map),
            (None, Some(FormData::Pairs(pairs)), _) => builder.form(pairs),
            (None, None, Some(RequestBody::Json(json))) => builder.json(json),
            (None, None, Some(RequestBody::Text(text))) => builder.body(text.clone()),
            (None, None, None) => builder,
        };

        self.log_fingerprint(&url, opts);

        let response = builder.send().await.map_err(map_transport_error)?;

        let status_code = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = flatten_headers(response.headers());

        if let Some(len) = response.content_length()
            && len > self.config.max_bytes as u64
        {
            return Err(Error::FetchTooLarge(format!(
                "Response of {len} bytes exceeds the {} byte limit.",
                self.config.max_bytes
            )));
        }

        let encoding = opts
            .default_encoding
            .as_deref()
            .or(self.session.default_encoding.as_deref())
            .unwrap_or("utf-8");
        let text = response.text_with_charset(encoding).await.map_err(map_transport_error)?;

        if text.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "Response of {} bytes exceeds the {} byte limit.",
                text.len(),
                self.config.max_bytes
            )));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(%url, %final_url, status_code, fetch_ms, bytes = text.len(), "fetched");

        if status_code >= 400 {
            return Err(Error::http_status(status_code, &truncate(&text, ERROR_SNIPPET_CHARS)));
        }

        Ok(FetchResult { status_code, final_url, text, headers })
    }
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), Error> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| Error::InvalidInput(format!("invalid header name: {name}")))?;
    let value =
        HeaderValue::from_str(value).map_err(|_| Error::InvalidInput(format!("invalid value for header {name}")))?;
    headers.insert(name, value);
    Ok(())
}

/// Collapse a header map into a sorted map, joining repeats with ", ".
fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    flat
}

fn map_transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::timeout()
    } else if err.is_connect() && is_tls_failure(&err) {
        Error::TlsFailed(TLS_MESSAGE.to_string())
    } else if err.is_connect() {
        Error::ConnectionFailed(CONNECTION_MESSAGE.to_string())
    } else if err.is_builder() {
        Error::InvalidInput(format!("Invalid request: {err}"))
    } else if err.is_redirect() {
        Error::RequestFailed(format!("Request failed: too many redirects ({err})"))
    } else {
        Error::RequestFailed(format!("Request failed: {err}"))
    }
}

/// Walk the source chain; the top-level message embeds the URL and is skipped.
fn is_tls_failure(err: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(current) = source {
        let text = current.to_string().to_ascii_lowercase();
        if ["certificate", "tls", "handshake", "ssl"].iter().any(|needle| text.contains(needle)) {
            return true;
        }
        source = current.source();
    }
    false
}
