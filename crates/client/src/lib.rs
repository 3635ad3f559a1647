//! Client code for stealth-fetch.
//!
//! This crate provides the impersonating HTTP transport, the pure content
//! extractors, and the bounded-concurrency batch executor used by the server.

pub mod batch;
pub mod extract;
pub mod fetch;

pub use batch::{BatchOptions, BatchOutcome, MAX_BATCH_CONCURRENCY, MAX_BATCH_URLS, execute_batch};

pub use extract::{
    ExtractedLink, Feed, FeedItem, MetadataBundle, RobotsGroup, RobotsTxt, TableExtract, clean_html, compile_pattern,
    extract_links, extract_metadata, extract_tables, normalize_whitespace, parse_feed, parse_robots_txt, parse_selector,
};

pub use fetch::{
    FetchClient, FetchConfig, FetchRequest, FetchResult, Fetcher, HttpMethod, RequestBody, RequestOptions,
    SessionOptions, parse_http_url, robots_url,
};
