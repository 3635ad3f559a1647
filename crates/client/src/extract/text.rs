//! Readable text rendering of HTML documents.
//!
//! Noise elements are dropped, block elements become lines, and anchors are
//! kept inline as markdown links:
//!
//! - `h1`..`h6` → `#`-prefixed lines
//! - `li` → `- ` lines
//! - `p` and leaf `div`s → plain lines
//! - `<a href>` → `[text](href)`, text falling back to the href

use scraper::{ElementRef, Html, Node};
use stealth_fetch_core::{Error, truncate};

use super::{normalize_whitespace, parse_selector};

/// Elements whose content never reaches the rendered text.
pub const NOISE_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "footer", "aside", "form", "svg", "iframe", "template",
];

const BLOCK_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6", "p", "li", "div"];

fn is_noise(name: &str) -> bool {
    NOISE_TAGS.contains(&name)
}

fn is_block(name: &str) -> bool {
    BLOCK_TAGS.contains(&name)
}

/// Whether the element or any ancestor is a noise element.
fn in_noise(element: &ElementRef<'_>) -> bool {
    is_noise(element.value().name())
        || element
            .ancestors()
            .any(|node| node.value().as_element().is_some_and(|el| is_noise(el.name())))
}

/// Render `html` as readable text, truncated to `max_chars`.
///
/// With a `selector`, only the first matching element outside noise is
/// rendered. When nothing matches the whole document is rendered instead,
/// prefixed by `[selector not found: <selector>]`.
pub fn clean_html(html: &str, selector: Option<&str>, max_chars: usize) -> Result<String, Error> {
    let document = Html::parse_document(html);

    let mut prefix = String::new();
    let mut target = body_or_root(&document);

    if let Some(raw) = selector.map(str::trim).filter(|s| !s.is_empty()) {
        let parsed = parse_selector(raw)?;
        match document.select(&parsed).find(|el| !in_noise(el)) {
            Some(found) => target = found,
            None => prefix = format!("[selector not found: {raw}]\n\n"),
        }
    }

    let mut blocks = Vec::new();
    for element in target.descendants().filter_map(ElementRef::wrap) {
        let name = element.value().name();
        if !is_block(name) || in_noise(&element) {
            continue;
        }
        if name == "div" && has_block_child(&element) {
            continue;
        }

        let mut buf = String::new();
        inline_text(element, &mut buf);
        let text = normalize_whitespace(&buf);
        if text.is_empty() {
            continue;
        }

        blocks.push(match name {
            "li" => format!("- {text}"),
            heading if heading.len() == 2 && heading.starts_with('h') => {
                let level = heading[1..].parse::<usize>().unwrap_or(1);
                format!("{} {text}", "#".repeat(level))
            }
            _ => text,
        });
    }

    let rendered = format!("{prefix}{}", blocks.join("\n\n"));
    Ok(truncate(rendered.trim(), max_chars))
}

fn body_or_root(document: &Html) -> ElementRef<'_> {
    document
        .root_element()
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "body")
        .unwrap_or_else(|| document.root_element())
}

fn has_block_child(element: &ElementRef<'_>) -> bool {
    element.children().filter_map(ElementRef::wrap).any(|child| is_block(child.value().name()))
}

/// Append the inline rendering of the children of `element` to `buf`.
fn inline_text(element: ElementRef<'_>, buf: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => buf.push_str(text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    inline_element(child, buf);
                }
            }
            _ => {}
        }
    }
}

fn inline_element(element: ElementRef<'_>, buf: &mut String) {
    let name = element.value().name();
    if is_noise(name) {
        return;
    }

    if name == "a" {
        let href = element.value().attr("href").map(str::trim).unwrap_or_default();
        let mut inner = String::new();
        inline_text(element, &mut inner);
        let label = normalize_whitespace(&inner);
        let label = if label.is_empty() { href } else { label.as_str() };
        if href.is_empty() {
            buf.push_str(&format!(" {label} "));
        } else {
            buf.push_str(&format!(" [{label}]({href}) "));
        }
        return;
    }

    let spaced = is_block(name) || name == "br";
    if spaced {
        buf.push(' ');
    }
    inline_text(element, buf);
    if spaced {
        buf.push(' ');
    }
}
