//! RSS 2.0, RSS 1.0 (RDF) and Atom feed parsing.
//!
//! The document is read with quick-xml into a small element tree first so
//! malformed XML fails as a whole before any field mapping happens.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::Serialize;
use stealth_fetch_core::Error;

/// One feed entry mapped onto the common shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub published: Option<String>,
    pub summary: Option<String>,
}

/// A parsed feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Feed {
    pub feed_title: Option<String>,
    pub feed_link: Option<String>,
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Default)]
struct XmlElement {
    /// Local name, namespace prefix removed
    name: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<XmlElement>,
}

impl XmlElement {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, Error> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(invalid_xml)?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value().map_err(invalid_xml)?.into_owned();
            attrs.push((key, value));
        }
        Ok(Self { name, attrs, ..Default::default() })
    }

    fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// Trimmed text of the first child named `name`, if non-empty.
    fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).map(|c| c.text.trim().to_string()).filter(|t| !t.is_empty())
    }
}

fn invalid_xml(err: impl std::fmt::Display) -> Error {
    Error::ParseFailed(format!("Invalid XML feed: {err}"))
}

/// Read `xml` into an element tree, returning the root element.
fn parse_tree(xml: &str) -> Result<XmlElement, Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| invalid_xml(format!("{e} at position {}", reader.error_position())))?;
        match event {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(invalid_xml("content after the root element"));
                }
                stack.push(XmlElement::from_start(&start)?);
            }
            Event::Empty(start) => {
                let element = XmlElement::from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, element)?;
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(invalid_xml)?;
                match stack.last_mut() {
                    Some(current) => current.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => return Err(invalid_xml("text outside of the root element")),
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(invalid_xml(format!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| invalid_xml("no root element found"))
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) -> Result<(), Error> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(invalid_xml("content after the root element")),
    }
    Ok(())
}

/// Parse an RSS or Atom document, keeping at most `max_items` entries.
///
/// # Errors
///
/// `ParseFailed` with an `Invalid XML feed:` message when the document is not
/// well-formed XML, or `Unrecognized feed format:` when the root element is
/// not `rss`, `RDF` or `feed`.
pub fn parse_feed(xml: &str, max_items: usize) -> Result<Feed, Error> {
    let root = parse_tree(xml)?;

    match root.name.as_str() {
        "rss" => {
            let channel = root.child("channel");
            let items = channel.into_iter().flat_map(|c| c.children_named("item"));
            Ok(parse_rss(channel, items, max_items))
        }
        "RDF" => Ok(parse_rss(root.child("channel"), root.children_named("item"), max_items)),
        "feed" => Ok(parse_atom(&root, max_items)),
        other => Err(Error::ParseFailed(format!("Unrecognized feed format: {other}"))),
    }
}

fn parse_rss<'a>(
    channel: Option<&XmlElement>, items: impl Iterator<Item = &'a XmlElement>, max_items: usize,
) -> Feed {
    let items = items
        .take(max_items)
        .map(|item| FeedItem {
            title: item.child_text("title").unwrap_or_default(),
            link: item
                .child_text("link")
                .or_else(|| item.attr("about").map(str::to_string))
                .unwrap_or_default(),
            published: item.child_text("pubDate").or_else(|| item.child_text("date")),
            summary: item.child_text("description").or_else(|| item.child_text("encoded")),
        })
        .collect();

    Feed {
        feed_title: channel.and_then(|c| c.child_text("title")),
        feed_link: channel.and_then(|c| c.child_text("link")),
        items,
    }
}

/// `rel="alternate"` (or no rel) link href, else the first link's href.
fn atom_link(element: &XmlElement) -> Option<String> {
    let mut links = element.children_named("link");
    let preferred = element
        .children_named("link")
        .find(|l| matches!(l.attr("rel"), None | Some("alternate")))
        .and_then(|l| l.attr("href"));
    preferred
        .or_else(|| links.find_map(|l| l.attr("href")))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
}

fn parse_atom(feed: &XmlElement, max_items: usize) -> Feed {
    let items = feed
        .children_named("entry")
        .take(max_items)
        .map(|entry| FeedItem {
            title: entry.child_text("title").unwrap_or_default(),
            link: atom_link(entry).unwrap_or_default(),
            published: entry.child_text("updated").or_else(|| entry.child_text("published")),
            summary: entry.child_text("summary").or_else(|| entry.child_text("content")),
        })
        .collect();

    Feed { feed_title: feed.child_text("title"), feed_link: atom_link(feed), items }
}
