//! HTML table extraction.

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use super::element_text;

/// One table's header cells and data rows. Row widths are not reconciled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableExtract {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn is_named(element: &ElementRef<'_>, name: &str) -> bool {
    element.value().name() == name
}

/// Whether `node` has a `<table>` ancestor strictly below `stop` (or anywhere, without `stop`).
fn has_table_ancestor(node: &ElementRef<'_>, stop: Option<&ElementRef<'_>>) -> bool {
    node.ancestors()
        .take_while(|ancestor| stop.is_none_or(|stop| ancestor.id() != stop.id()))
        .filter_map(ElementRef::wrap)
        .any(|ancestor| is_named(&ancestor, "table"))
}

/// Extract tables in document order.
///
/// Without a selector every outermost table is extracted. With one, matched
/// `<table>` elements are used directly (nested or not) and other matched
/// elements contribute their outermost descendant tables. A selector that
/// matches nothing yields no tables.
pub fn extract_tables(html: &str, selector: Option<&Selector>) -> Vec<TableExtract> {
    let document = Html::parse_document(html);
    let Ok(all_tables) = Selector::parse("table") else {
        return Vec::new();
    };

    let mut tables: Vec<ElementRef<'_>> = Vec::new();
    match selector {
        None => tables.extend(document.select(&all_tables).filter(|t| !has_table_ancestor(t, None))),
        Some(selector) => {
            for scope in document.select(selector) {
                if is_named(&scope, "table") {
                    tables.push(scope);
                } else {
                    tables.extend(scope.select(&all_tables).filter(|t| !has_table_ancestor(t, Some(&scope))));
                }
            }
        }
    }

    let mut seen = Vec::new();
    tables.retain(|t| {
        if seen.contains(&t.id()) {
            false
        } else {
            seen.push(t.id());
            true
        }
    });

    tables.iter().map(extract_table).collect()
}

fn extract_table(table: &ElementRef<'_>) -> TableExtract {
    // Rows whose nearest table is this one; nested tables keep their own rows.
    let rows: Vec<ElementRef<'_>> = table
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| is_named(el, "tr"))
        .filter(|row| {
            row.ancestors()
                .filter_map(ElementRef::wrap)
                .find(|a| is_named(a, "table"))
                .is_some_and(|nearest| nearest.id() == table.id())
        })
        .collect();

    let in_thead = |row: &ElementRef<'_>| {
        row.ancestors()
            .take_while(|a| a.id() != table.id())
            .filter_map(ElementRef::wrap)
            .any(|a| is_named(&a, "thead"))
    };

    let (head, body): (Vec<_>, Vec<_>) = rows.into_iter().partition(|row| in_thead(row));

    let (headers, data) = if let Some(first) = head.first() {
        (cell_texts(first), body)
    } else if body.first().is_some_and(is_header_row) {
        (cell_texts(&body[0]), body[1..].to_vec())
    } else {
        (Vec::new(), body)
    };

    TableExtract {
        headers,
        rows: data.iter().map(cell_texts).filter(|cells| !cells.is_empty()).collect(),
    }
}

fn cells<'a>(row: &ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| is_named(cell, "th") || is_named(cell, "td"))
}

fn cell_texts(row: &ElementRef<'_>) -> Vec<String> {
    cells(row).map(|cell| element_text(&cell)).collect()
}

fn is_header_row(row: &ElementRef<'_>) -> bool {
    let mut any = false;
    for cell in cells(row) {
        if !is_named(&cell, "th") {
            return false;
        }
        any = true;
    }
    any
}
