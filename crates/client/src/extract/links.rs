//! Link harvesting from HTML documents.

use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;
use stealth_fetch_core::Error;
use url::Url;

use super::element_text;
use crate::fetch::resolve_href;

/// Default selector for link extraction.
pub const DEFAULT_LINK_SELECTOR: &str = "a[href]";

/// A harvested link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedLink {
    /// Whitespace-normalized link text
    pub text: String,
    /// The href exactly as written, trimmed
    pub href: String,
    /// href resolved against the page URL
    pub absolute_url: String,
}

/// Compile a link filter pattern, reporting failures as invalid input.
pub fn compile_pattern(pattern: &str) -> Result<Regex, Error> {
    Regex::new(pattern).map_err(|e| Error::InvalidInput(format!("Invalid regex pattern: {e}")))
}

/// Extract links from an HTML document in document order.
///
/// Elements without a non-empty `href` are skipped. When `pattern` is given
/// it must match somewhere in the raw href. Duplicates are kept; at most
/// `max_results` links are returned.
pub fn extract_links(
    html: &str, base_url: &Url, selector: &Selector, pattern: Option<&Regex>, max_results: usize,
) -> Vec<ExtractedLink> {
    let document = Html::parse_document(html);

    document
        .select(selector)
        .filter_map(|element| {
            let href = element.value().attr("href").map(str::trim).unwrap_or_default();
            if href.is_empty() {
                return None;
            }
            if let Some(regex) = pattern
                && !regex.is_match(href)
            {
                return None;
            }
            Some(ExtractedLink {
                text: element_text(&element),
                href: href.to_string(),
                absolute_url: resolve_href(base_url, href),
            })
        })
        .take(max_results)
        .collect()
}
