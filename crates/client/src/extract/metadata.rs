//! Structured metadata: JSON-LD, Open Graph, Twitter Card and meta tags.

use std::collections::BTreeMap;

use scraper::{Html, Selector};
use serde::Serialize;

/// Metadata found in a document's markup. Every part may be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetadataBundle {
    /// Parsed `application/ld+json` blocks in document order
    pub json_ld: Vec<serde_json::Value>,
    /// `og:*` properties keyed without the prefix
    pub opengraph: BTreeMap<String, String>,
    /// `twitter:*` entries keyed without the prefix
    pub twitter: BTreeMap<String, String>,
    /// Remaining `<meta name=...>` tags
    pub meta: BTreeMap<String, String>,
}

/// Collect metadata from `html`. Duplicate keys keep the last value seen.
pub fn extract_metadata(html: &str) -> MetadataBundle {
    let document = Html::parse_document(html);
    let mut bundle = MetadataBundle::default();

    if let Ok(scripts) = Selector::parse("script[type]") {
        for script in document.select(&scripts) {
            let kind = script.value().attr("type").unwrap_or_default().trim();
            if !kind.eq_ignore_ascii_case("application/ld+json") {
                continue;
            }
            let raw: String = script.text().collect();
            match serde_json::from_str::<serde_json::Value>(raw.trim()) {
                Ok(value) => bundle.json_ld.push(value),
                Err(e) => tracing::debug!(error = %e, "skipping invalid JSON-LD block"),
            }
        }
    }

    if let Ok(metas) = Selector::parse("meta") {
        for meta in document.select(&metas) {
            let el = meta.value();
            let Some(content) = el.attr("content") else {
                continue;
            };
            let content = content.trim().to_string();
            let property = el.attr("property").map(str::trim);
            let name = el.attr("name").map(str::trim);

            if let Some(key) = property.and_then(|p| strip_prefix_ci(p, "og:")) {
                bundle.opengraph.insert(key.to_string(), content);
            } else if let Some(key) = name.or(property).and_then(|k| strip_prefix_ci(k, "twitter:")) {
                bundle.twitter.insert(key.to_string(), content);
            } else if let Some(name) = name.filter(|n| !n.is_empty()) {
                bundle.meta.insert(name.to_string(), content);
            }
        }
    }

    bundle
}

fn strip_prefix_ci<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &value[prefix.len()..]).filter(|rest| !rest.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_ld_og_twitter_and_meta() {
        let html = r#"
            <html>
              <head>
                <script type="application/ld+json">{"@type": "Article", "name": "Test"}</script>
                <meta property="og:title" content="OG Title" />
                <meta property="og:url" content="https://example.com" />
                <meta name="twitter:card" content="summary" />
                <meta name="description" content="Page desc" />
                <meta name="viewport" content="width=device-width" />
              </head>
              <body></body>
            </html>
        "#;

        let data = extract_metadata(html);

        assert_eq!(data.json_ld, vec![json!({"@type": "Article", "name": "Test"})]);
        assert_eq!(data.opengraph["title"], "OG Title");
        assert_eq!(data.opengraph["url"], "https://example.com");
        assert_eq!(data.twitter["card"], "summary");
        assert_eq!(data.meta["description"], "Page desc");
        assert_eq!(data.meta["viewport"], "width=device-width");
        assert!(!data.meta.contains_key("title"));
        assert!(!data.meta.contains_key("card"));
        assert!(!data.meta.contains_key("twitter:card"));
    }

    #[test]
    fn test_invalid_json_ld_skipped() {
        let html = r#"
            <script type="application/ld+json">not json</script>
            <script type="application/ld+json">{"ok": true}</script>
        "#;
        let data = extract_metadata(html);
        assert_eq!(data.json_ld, vec![json!({"ok": true})]);
    }

    #[test]
    fn test_empty_page() {
        let data = extract_metadata("<html></html>");
        assert_eq!(data, MetadataBundle::default());
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({"json_ld": [], "opengraph": {}, "twitter": {}, "meta": {}})
        );
    }

    #[test]
    fn test_last_seen_wins() {
        let html = r#"
            <meta property="og:title" content="First" />
            <meta property="og:title" content="Second" />
            <meta name="description" content="a" />
            <meta name="description" content="b" />
        "#;
        let data = extract_metadata(html);
        assert_eq!(data.opengraph["title"], "Second");
        assert_eq!(data.meta["description"], "b");
    }

    #[test]
    fn test_twitter_via_property() {
        let data = extract_metadata(r#"<meta property="twitter:site" content="@example" />"#);
        assert_eq!(data.twitter["site"], "@example");
    }

    #[test]
    fn test_meta_without_content_ignored() {
        let data = extract_metadata(r#"<meta charset="utf-8"><meta name="robots">"#);
        assert!(data.meta.is_empty());
    }

    #[test]
    fn test_sorted_keys_in_json() {
        let html = r#"<meta name="zeta" content="1"><meta name="alpha" content="2">"#;
        let encoded = serde_json::to_string(&extract_metadata(html)).unwrap();
        let alpha = encoded.find("alpha").unwrap();
        let zeta = encoded.find("zeta").unwrap();
        assert!(alpha < zeta);
    }
}
