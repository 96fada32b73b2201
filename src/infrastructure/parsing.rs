//! HTML parsing for statistics pages, entity info panels and upgrade
//! sections
//!
//! Parse misses are never errors here: a missing panel, label or pattern
//! simply yields no data for that field.

pub mod error;
pub mod icon_matcher;
pub mod infobox_parser;
pub mod overrides;
pub mod statistics_parser;
pub mod upgrade_parser;

pub use error::ScrapeError;
pub use infobox_parser::EntityPageParser;
pub use upgrade_parser::UpgradeExtractor;

use scraper::ElementRef;

/// Concatenated text content of an element, the way the source markup
/// renders it (no separators inserted between text nodes).
pub(crate) fn element_text(element: &ElementRef) -> String {
    element.text().collect()
}

/// Byte offset of the first ASCII-case-insensitive occurrence of `needle`
/// in `haystack`.
pub(crate) fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}
