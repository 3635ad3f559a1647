//! Unified error types for stealth-fetch.
//!
//! Display strings carry a stable code prefix for logs; the MCP error message
//! carries only the human-actionable text.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Message used whenever a request exceeds its deadline.
pub const TIMEOUT_MESSAGE: &str = "Request timed out. Try increasing the timeout value.";

/// Message used for DNS and TCP connection failures.
pub const CONNECTION_MESSAGE: &str = "DNS/connection failed. Check that the URL is correct and reachable.";

/// Message used for TLS handshake and certificate failures.
pub const TLS_MESSAGE: &str = "TLS/impersonation error. Try a different impersonate target or verify certificates.";

/// Unified error types for the stealth-fetch server.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (bad bounds, bad selector, bad regex).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid or unsupported URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Request exceeded its timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Response body exceeded the configured byte limit.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Server answered with a 4xx/5xx status.
    #[error("HTTP_ERROR: {message}")]
    HttpStatus { status: u16, message: String },

    /// DNS resolution or TCP connect failed.
    #[error("CONNECTION_FAILED: {0}")]
    ConnectionFailed(String),

    /// TLS handshake or certificate verification failed.
    #[error("TLS_FAILED: {0}")]
    TlsFailed(String),

    /// Any other transport failure.
    #[error("REQUEST_FAILED: {0}")]
    RequestFailed(String),

    /// Malformed feed or XML document.
    #[error("PARSE_FAILED: {0}")]
    ParseFailed(String),

    /// Unexpected internal failure.
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl Error {
    /// Timeout error carrying the standard guidance text.
    pub fn timeout() -> Self {
        Error::FetchTimeout(TIMEOUT_MESSAGE.to_string())
    }

    /// Build an HTTP status error, appending the response snippet when non-empty.
    pub fn http_status(status: u16, snippet: &str) -> Self {
        let snippet = snippet.trim();
        let message = if snippet.is_empty() {
            format!("HTTP {status} error.")
        } else {
            format!("HTTP {status} error. Response snippet: {snippet}")
        };
        Error::HttpStatus { status, message }
    }

    /// The human-readable message without the code prefix.
    pub fn message(&self) -> &str {
        match self {
            Error::InvalidInput(msg)
            | Error::InvalidUrl(msg)
            | Error::FetchTimeout(msg)
            | Error::FetchTooLarge(msg)
            | Error::ConnectionFailed(msg)
            | Error::TlsFailed(msg)
            | Error::RequestFailed(msg)
            | Error::ParseFailed(msg)
            | Error::Internal(msg) => msg,
            Error::HttpStatus { message, .. } => message,
        }
    }

    fn code(&self) -> i32 {
        match self {
            Error::InvalidInput(_) | Error::InvalidUrl(_) => -32602,
            Error::FetchTimeout(_) => -32006,
            Error::FetchTooLarge(_) => -32007,
            Error::HttpStatus { .. } => -32008,
            Error::ConnectionFailed(_) => -32013,
            Error::TlsFailed(_) => -32014,
            Error::RequestFailed(_) => -32015,
            Error::ParseFailed(_) => -32016,
            Error::Internal(_) => -32603,
        }
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        McpError { code: ErrorCode(err.code()), message: err.message().to_string().into(), data: None }
    }
}
