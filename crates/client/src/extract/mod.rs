//! Content extraction from fetched documents.
//!
//! Every extractor here is a pure function of its input text: no I/O, no
//! shared state, and malformed HTML degrades to partial output rather than
//! failing. Only the feed parser rejects its input, since a feed that is not
//! XML has no meaningful partial reading.
//!
//! ### Extractors
//! - `text`: markdown-like readable text with noise elements removed
//! - `links`: anchors with absolute URLs, optional regex filter
//! - `metadata`: JSON-LD, Open Graph, Twitter Card and generic meta tags
//! - `tables`: headers and rows of outermost tables
//! - `feed`: RSS 2.0, RSS 1.0 (RDF) and Atom
//! - `robots`: robots.txt groups and sitemaps

pub mod feed;
pub mod links;
pub mod metadata;
pub mod robots;
pub mod tables;
pub mod text;

pub use feed::{Feed, FeedItem, parse_feed};
pub use links::{ExtractedLink, compile_pattern, extract_links};
pub use metadata::{MetadataBundle, extract_metadata};
pub use robots::{RobotsGroup, RobotsTxt, parse_robots_txt};
pub use tables::{TableExtract, extract_tables};
pub use text::clean_html;

use scraper::{ElementRef, Selector};
use stealth_fetch_core::Error;

/// Parse a CSS selector, reporting failures as invalid input.
pub fn parse_selector(selector: &str) -> Result<Selector, Error> {
    Selector::parse(selector).map_err(|e| Error::InvalidInput(format!("Invalid CSS selector {selector:?}: {e}")))
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace-normalized text of an element and its descendants.
pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}
