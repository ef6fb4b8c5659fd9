//! Main-content text for pages without recipe markup.
//!
//! Removes boilerplate elements, picks the most likely content region and
//! flattens it to whitespace-collapsed text for the inference parser.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};

use super::collapse_whitespace;

/// Elements that never carry recipe text.
const BOILERPLATE: &[&str] = &[
    "script",
    "style",
    "noscript",
    "iframe",
    "nav",
    "footer",
    "header",
    "aside",
    ".nav",
    ".footer",
    ".header",
    ".sidebar",
    ".ad",
    ".advertisement",
];

/// Candidate content regions, first match wins.
const MAIN_CONTENT: &str = r#"article, main, .recipe, .recipe-content, [class*="recipe"]"#;

/// Reduce a page to at most `max_chars` characters of main-content text.
pub fn reduce(html: &str, max_chars: usize) -> String {
    let document = Html::parse_document(html);

    let removed: HashSet<_> = BOILERPLATE
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .flat_map(|sel| document.select(&sel).map(|el| el.id()).collect::<Vec<_>>())
        .collect();

    let is_removed = |element: ElementRef<'_>| {
        removed.contains(&element.id()) || element.ancestors().any(|a| removed.contains(&a.id()))
    };

    let region = Selector::parse(MAIN_CONTENT)
        .ok()
        .and_then(|sel| document.select(&sel).find(|el| !is_removed(*el)))
        .or_else(|| {
            Selector::parse("body")
                .ok()
                .and_then(|sel| document.select(&sel).next())
        })
        .unwrap_or_else(|| document.root_element());

    let mut text = String::new();
    for node in region.descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        if removed.contains(&node.id()) || node.ancestors().any(|a| removed.contains(&a.id())) {
            continue;
        }
        text.push_str(fragment);
        text.push(' ');
    }

    truncate_chars(&collapse_whitespace(&text), max_chars)
}

/// Truncate to `max_chars` characters, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
