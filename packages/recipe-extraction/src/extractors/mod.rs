//! HTML extraction layers.
//!
//! - [`ExtractorRegistry`]: site-specific parsers keyed by exact hostname
//! - [`schema_org`]: JSON-LD and microdata recipe markup
//! - [`content`]: boilerplate removal for inference input

pub mod content;
pub mod schema_org;
pub mod xiachufang;

use std::collections::HashMap;
use std::sync::Arc;

use scraper::{ElementRef, Selector};

use crate::traits::extractor::SiteExtractor;

pub use xiachufang::XiachufangExtractor;

/// Hostname → site extractor lookup.
///
/// Matching is exact. Mobile and `www.` hosts must be registered
/// explicitly.
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<String, Arc<dyn SiteExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in site extractor.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            ["xiachufang.com", "www.xiachufang.com", "m.xiachufang.com"],
            Arc::new(XiachufangExtractor),
        );
        registry
    }

    pub fn register<I, S>(&mut self, hosts: I, extractor: Arc<dyn SiteExtractor>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for host in hosts {
            self.extractors
                .insert(host.into().to_ascii_lowercase(), extractor.clone());
        }
    }

    pub fn get(&self, hostname: &str) -> Option<Arc<dyn SiteExtractor>> {
        self.extractors
            .get(&hostname.to_ascii_lowercase())
            .cloned()
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.extractors.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("hosts", &self.extractors.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Whitespace-collapsed text of an element.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First descendant matching `css`, if the selector parses.
pub(crate) fn select_first<'a>(element: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    element.select(&selector).next()
}

/// Text of the first descendant matching `css`, `None` when blank.
pub(crate) fn select_text(element: ElementRef<'_>, css: &str) -> Option<String> {
    select_first(element, css)
        .map(element_text)
        .filter(|t| !t.is_empty())
}
