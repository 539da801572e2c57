pub mod interval;
pub mod region;
pub mod station;

use scraper::ElementRef;

use crate::text::squash_whitespace;

/// Visible text of an element with whitespace runs collapsed.
fn element_text(element: ElementRef<'_>) -> String {
    squash_whitespace(&element.text().collect::<String>())
}

/// Element children only, skipping text and comment nodes.
fn child_elements<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}

/// Rows that belong to `table` itself, looking through the row-group
/// wrappers the HTML parser inserts.
fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    child_elements(table)
        .flat_map(|child| match child.value().name() {
            "tbody" | "thead" | "tfoot" => child_elements(child).collect::<Vec<_>>(),
            _ => vec![child],
        })
        .filter(|row| row.value().name() == "tr")
        .collect()
}
