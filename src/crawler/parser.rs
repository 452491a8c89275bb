//! HTML parser for extracting anchors and the page title
//!
//! This is a thin layer over `scraper`. It reports what the document
//! contains and leaves every crawl decision (resolution, filtering,
//! deduplication) to the fetcher.

use scraper::{Html, Selector};

/// An `<a href>` element as found in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Raw `href` attribute, untrimmed and unresolved
    pub href: String,
    /// Text content of the anchor with whitespace collapsed
    pub text: String,
}

/// Parses an HTML document
///
/// `html5ever` recovers from any input, so this never fails; callers decide
/// what counts as a malformed page.
pub fn parse_document(html: &str) -> Html {
    Html::parse_document(html)
}

/// Extracts the page title (from `<title>`), trimmed
///
/// Returns `None` if there is no title or it is blank.
pub fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Extracts every anchor with an `href`, in document order
pub fn extract_anchors(document: &Html) -> Vec<Anchor> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            Some(Anchor {
                href: href.to_string(),
                text: collapse_whitespace(&element.text().collect::<String>()),
            })
        })
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
