//! Session-level and per-request transport options.
//!
//! These are the knobs a caller may pass through to the transport. They are
//! validated up front so a bad option never reaches the network.

use std::collections::BTreeMap;
use std::net::IpAddr;

use reqwest::header::{HeaderName, HeaderValue};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stealth_fetch_core::{Error, Impersonate};

/// Timeout in seconds, either total or `[connect, read]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum TimeoutSpec {
    Total(f64),
    Split(f64, f64),
}

impl TimeoutSpec {
    /// Total wall-clock deadline in seconds.
    pub fn total_secs(&self) -> f64 {
        match *self {
            TimeoutSpec::Total(total) => total,
            TimeoutSpec::Split(connect, read) => connect + read,
        }
    }

    fn validate(&self, field: &str) -> Result<(), Error> {
        let parts = match *self {
            TimeoutSpec::Total(total) => vec![total],
            TimeoutSpec::Split(connect, read) => vec![connect, read],
        };
        if parts.iter().any(|v| !(*v > 0.0 && *v <= 300.0)) {
            return Err(Error::InvalidInput(format!("{field} must be greater than 0 and at most 300 seconds")));
        }
        Ok(())
    }
}

/// TLS verification: on/off, or a path to a PEM CA bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Verify {
    Enabled(bool),
    CaBundle(String),
}

impl Default for Verify {
    fn default() -> Self {
        Verify::Enabled(true)
    }
}

/// Client certificate: one PEM holding cert and key, or `[cert_path, key_path]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ClientCert {
    Combined(String),
    Pair(String, String),
}

/// Query parameters as a map or as ordered pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum QueryParams {
    Map(BTreeMap<String, serde_json::Value>),
    Pairs(Vec<(String, serde_json::Value)>),
}

impl QueryParams {
    /// Flatten into string pairs; non-string scalars use their JSON text.
    pub fn pairs(&self) -> Vec<(String, String)> {
        let render = |v: &serde_json::Value| match v {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        match self {
            QueryParams::Map(map) => map.iter().map(|(k, v)| (k.clone(), render(v))).collect(),
            QueryParams::Pairs(pairs) => pairs.iter().map(|(k, v)| (k.clone(), render(v))).collect(),
        }
    }
}

/// Form or raw text request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FormData {
    Text(String),
    Map(BTreeMap<String, String>),
    Pairs(Vec<(String, String)>),
}

/// HTTP version strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HttpVersion {
    V1,
    V2,
    V2tls,
    V2PriorKnowledge,
    V3,
    V3only,
}

/// TLS certificate compression preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CertCompression {
    Zlib,
    Brotli,
}

/// Additional TLS/HTTP2 fingerprint overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ExtraFingerprint {
    /// TLS min version (769 TLSv1.0 .. 772 TLSv1.3).
    pub tls_min_version: Option<u16>,
    /// Enable TLS GREASE extension.
    pub tls_grease: Option<bool>,
    /// Permute TLS extension order in ClientHello.
    pub tls_permute_extensions: Option<bool>,
    /// TLS certificate compression preference.
    pub tls_cert_compression: Option<CertCompression>,
    /// TLS signature algorithms list.
    pub tls_signature_algorithms: Option<Vec<String>>,
    /// TLS delegated credential signature algorithms string.
    pub tls_delegated_credential: Option<String>,
    /// TLS record size limit extension value.
    pub tls_record_size_limit: Option<u32>,
    /// HTTP/2 stream weight fingerprint value.
    pub http2_stream_weight: Option<u32>,
    /// HTTP/2 stream exclusive fingerprint value.
    pub http2_stream_exclusive: Option<u8>,
    /// Disable HTTP/2 priority signals in fingerprint.
    pub http2_no_priority: Option<bool>,
}

impl ExtraFingerprint {
    fn validate(&self) -> Result<(), Error> {
        if let Some(version) = self.tls_min_version
            && !(769..=772).contains(&version)
        {
            return Err(Error::InvalidInput(format!(
                "extra_fp.tls_min_version must be between 769 and 772, got {version}"
            )));
        }
        if let Some(weight) = self.http2_stream_weight
            && !(1..=256).contains(&weight)
        {
            return Err(Error::InvalidInput("extra_fp.http2_stream_weight must be between 1 and 256".into()));
        }
        if let Some(exclusive) = self.http2_stream_exclusive
            && exclusive > 1
        {
            return Err(Error::InvalidInput("extra_fp.http2_stream_exclusive must be 0 or 1".into()));
        }
        Ok(())
    }
}

/// Basic-auth style credential pair.
pub type Credentials = (String, String);

/// Session-level transport options.
///
/// Supplying these on a tool call builds a dedicated transport session for
/// that call instead of reusing the shared one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SessionOptions {
    /// Default session headers.
    pub headers: Option<BTreeMap<String, String>>,
    /// Default session cookies.
    pub cookies: Option<BTreeMap<String, String>>,
    /// HTTP basic auth `[username, password]`.
    pub auth: Option<Credentials>,
    /// Proxy map keyed by `http`, `https` or `all`.
    pub proxies: Option<BTreeMap<String, String>>,
    /// Single proxy URL for all requests.
    pub proxy: Option<String>,
    /// Proxy auth `[username, password]`.
    pub proxy_auth: Option<Credentials>,
    /// Default query params for all requests in this session.
    pub params: Option<QueryParams>,
    /// TLS verification (bool) or CA bundle path.
    pub verify: Option<Verify>,
    /// Session timeout seconds or `[connect, read]`.
    pub timeout: Option<TimeoutSpec>,
    /// Use proxy settings from environment variables.
    pub trust_env: Option<bool>,
    /// Default redirect behavior.
    pub allow_redirects: Option<bool>,
    /// Maximum redirects (-1 for unlimited).
    pub max_redirects: Option<i64>,
    /// Default browser impersonation target.
    pub impersonate: Option<String>,
    /// Custom JA3 TLS fingerprint string.
    pub ja3: Option<String>,
    /// Custom Akamai HTTP/2 fingerprint.
    pub akamai: Option<String>,
    /// Additional fingerprint overrides.
    pub extra_fp: Option<ExtraFingerprint>,
    /// Send the impersonation profile's browser headers.
    pub default_headers: Option<bool>,
    /// Response text encoding fallback.
    pub default_encoding: Option<String>,
    /// HTTP version strategy.
    pub http_version: Option<HttpVersion>,
    /// Bind sockets to this source IP.
    pub interface: Option<String>,
    /// Client cert path or `[cert_path, key_path]`.
    pub cert: Option<ClientCert>,
    /// Connection pool size per host.
    pub max_clients: Option<usize>,
}

impl SessionOptions {
    /// Whether any TLS/HTTP2 fingerprint override is present.
    pub fn has_fingerprint(&self) -> bool {
        self.ja3.is_some() || self.akamai.is_some() || self.extra_fp.is_some()
    }

    /// Validate every option without touching the network.
    pub fn validate(&self) -> Result<(), Error> {
        validate_headers(self.headers.as_ref())?;
        validate_transport(&TransportFields {
            proxy: self.proxy.as_deref(),
            proxies: self.proxies.as_ref(),
            timeout: self.timeout.as_ref(),
            max_redirects: self.max_redirects,
            impersonate: self.impersonate.as_deref(),
            ja3: self.ja3.as_deref(),
            extra_fp: self.extra_fp.as_ref(),
            default_encoding: self.default_encoding.as_deref(),
            http_version: self.http_version,
            interface: self.interface.as_deref(),
        })?;
        if let Some(max) = self.max_clients
            && !(1..=1000).contains(&max)
        {
            return Err(Error::InvalidInput("max_clients must be between 1 and 1000".into()));
        }
        Ok(())
    }
}

/// Per-request transport options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RequestOptions {
    /// Per-request query params.
    pub params: Option<QueryParams>,
    /// Request body for form/text payloads.
    pub data: Option<FormData>,
    /// Request JSON body payload.
    #[serde(rename = "json")]
    pub json_body: Option<serde_json::Value>,
    /// Per-request headers.
    pub headers: Option<BTreeMap<String, String>>,
    /// Per-request cookies.
    pub cookies: Option<BTreeMap<String, String>>,
    /// HTTP basic auth `[username, password]`.
    pub auth: Option<Credentials>,
    /// Request timeout seconds or `[connect, read]`.
    pub timeout: Option<TimeoutSpec>,
    /// Per-request redirect behavior.
    pub allow_redirects: Option<bool>,
    /// Maximum redirects (-1 for unlimited).
    pub max_redirects: Option<i64>,
    /// Proxy map keyed by `http`, `https` or `all`.
    pub proxies: Option<BTreeMap<String, String>>,
    /// Single proxy URL.
    pub proxy: Option<String>,
    /// Proxy auth `[username, password]`.
    pub proxy_auth: Option<Credentials>,
    /// TLS verification (bool) or CA bundle path.
    pub verify: Option<Verify>,
    /// Referer header shortcut.
    pub referer: Option<String>,
    /// Accept-Encoding header value.
    pub accept_encoding: Option<String>,
    /// Browser impersonation target for this request.
    pub impersonate: Option<String>,
    /// Custom JA3 TLS fingerprint.
    pub ja3: Option<String>,
    /// Custom Akamai HTTP/2 fingerprint.
    pub akamai: Option<String>,
    /// Additional fingerprint overrides.
    pub extra_fp: Option<ExtraFingerprint>,
    /// Send the impersonation profile's browser headers.
    pub default_headers: Option<bool>,
    /// Response text encoding fallback.
    pub default_encoding: Option<String>,
    /// HTTP version strategy.
    pub http_version: Option<HttpVersion>,
    /// Bind sockets to this source IP.
    pub interface: Option<String>,
    /// Client cert path or `[cert_path, key_path]`.
    pub cert: Option<ClientCert>,
    /// Streaming responses are not supported; must be absent or false.
    pub stream: Option<bool>,
}

impl RequestOptions {
    /// Validate every option without touching the network.
    pub fn validate(&self) -> Result<(), Error> {
        if self.stream == Some(true) {
            return Err(Error::InvalidInput("stream=true is not supported by this server's output mode.".into()));
        }
        if self.data.is_some() && self.json_body.is_some() {
            return Err(Error::InvalidInput("request_options.data and request_options.json are exclusive".into()));
        }
        validate_headers(self.headers.as_ref())?;
        for (name, value) in [("referer", &self.referer), ("accept_encoding", &self.accept_encoding)] {
            if let Some(value) = value
                && HeaderValue::from_str(value).is_err()
            {
                return Err(Error::InvalidInput(format!("invalid {name} header value")));
            }
        }
        validate_transport(&TransportFields {
            proxy: self.proxy.as_deref(),
            proxies: self.proxies.as_ref(),
            timeout: self.timeout.as_ref(),
            max_redirects: self.max_redirects,
            impersonate: self.impersonate.as_deref(),
            ja3: self.ja3.as_deref(),
            extra_fp: self.extra_fp.as_ref(),
            default_encoding: self.default_encoding.as_deref(),
            http_version: self.http_version,
            interface: self.interface.as_deref(),
        })
    }

    /// Whether any option requires a dedicated reqwest client.
    pub fn needs_dedicated_client(&self) -> bool {
        self.proxy.is_some()
            || self.proxies.is_some()
            || self.proxy_auth.is_some()
            || self.verify.is_some()
            || self.http_version.is_some()
            || self.interface.is_some()
            || self.cert.is_some()
            || self.max_redirects.is_some()
    }

    /// Whether any TLS/HTTP2 fingerprint override is present.
    pub fn has_fingerprint(&self) -> bool {
        self.ja3.is_some() || self.akamai.is_some() || self.extra_fp.is_some()
    }

    /// Merge `headers` over the existing per-request headers.
    ///
    /// Names compare case-insensitively, so `User-Agent` replaces an existing
    /// `user-agent` entry instead of sitting next to it.
    pub fn merge_headers(&mut self, headers: Option<BTreeMap<String, String>>) {
        if let Some(extra) = headers {
            let current = self.headers.get_or_insert_with(BTreeMap::new);
            for (name, value) in extra {
                current.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
                current.insert(name, value);
            }
        }
    }

    /// Whether a per-request header named `name` is set, in any case.
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.as_ref().is_some_and(|headers| headers.keys().any(|k| k.eq_ignore_ascii_case(name)))
    }
}

/// Fields shared between session and request option validation.
struct TransportFields<'a> {
    proxy: Option<&'a str>,
    proxies: Option<&'a BTreeMap<String, String>>,
    timeout: Option<&'a TimeoutSpec>,
    max_redirects: Option<i64>,
    impersonate: Option<&'a str>,
    ja3: Option<&'a str>,
    extra_fp: Option<&'a ExtraFingerprint>,
    default_encoding: Option<&'a str>,
    http_version: Option<HttpVersion>,
    interface: Option<&'a str>,
}

fn validate_transport(fields: &TransportFields<'_>) -> Result<(), Error> {
    if let Some(proxy) = fields.proxy {
        validate_proxy_url(proxy)?;
    }
    if let Some(proxies) = fields.proxies {
        for (scheme, proxy) in proxies {
            if !matches!(scheme.as_str(), "http" | "https" | "all") {
                return Err(Error::InvalidInput(format!(
                    "unsupported proxies key: {scheme} (expected http, https or all)"
                )));
            }
            validate_proxy_url(proxy)?;
        }
    }
    if let Some(timeout) = fields.timeout {
        timeout.validate("timeout")?;
    }
    if let Some(max) = fields.max_redirects
        && !(-1..=1000).contains(&max)
    {
        return Err(Error::InvalidInput("max_redirects must be between -1 and 1000".into()));
    }
    if let Some(target) = fields.impersonate {
        target.parse::<Impersonate>().map_err(|e| Error::InvalidInput(e.to_string()))?;
    }
    if let Some(ja3) = fields.ja3 {
        validate_ja3(ja3)?;
    }
    if let Some(extra) = fields.extra_fp {
        extra.validate()?;
    }
    if let Some(encoding) = fields.default_encoding
        && encoding.trim().is_empty()
    {
        return Err(Error::InvalidInput("default_encoding must not be empty".into()));
    }
    if matches!(fields.http_version, Some(HttpVersion::V3 | HttpVersion::V3only)) {
        return Err(Error::InvalidInput("HTTP/3 is not supported by this transport".into()));
    }
    if let Some(interface) = fields.interface
        && interface.parse::<IpAddr>().is_err()
    {
        return Err(Error::InvalidInput(format!("interface must be a source IP address, got {interface}")));
    }
    Ok(())
}

fn validate_headers(headers: Option<&BTreeMap<String, String>>) -> Result<(), Error> {
    for (name, value) in headers.into_iter().flatten() {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            return Err(Error::InvalidInput(format!("invalid header name: {name}")));
        }
        if HeaderValue::from_str(value).is_err() {
            return Err(Error::InvalidInput(format!("invalid value for header {name}")));
        }
    }
    Ok(())
}

fn validate_proxy_url(proxy: &str) -> Result<(), Error> {
    url::Url::parse(proxy).map_err(|e| Error::InvalidInput(format!("invalid proxy URL {proxy}: {e}")))?;
    Ok(())
}

/// JA3 is `version,ciphers,extensions,curves,point_formats` with `-` separated lists.
fn validate_ja3(ja3: &str) -> Result<(), Error> {
    let sections: Vec<&str> = ja3.split(',').collect();
    let well_formed = sections.len() == 5
        && !sections[0].is_empty()
        && sections
            .iter()
            .all(|s| s.chars().all(|c| c.is_ascii_digit() || c == '-'));
    if well_formed {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("invalid ja3 fingerprint: {ja3}")))
    }
}
