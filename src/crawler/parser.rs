//! HTML parser for extracting links and pagination controls
//!
//! This module handles parsing rendered HTML to extract:
//! - Outbound links to consider for the frontier
//! - The "next page" control, if the page has one

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// One-pass sequence of absolute link URLs found on a page state
///
/// The sequence is consumed by iteration and cannot be restarted; extracting
/// again requires the page again.
#[derive(Debug)]
pub struct Links(std::vec::IntoIter<String>);

impl Links {
    pub fn empty() -> Self {
        Self(Vec::new().into_iter())
    }
}

impl From<Vec<String>> for Links {
    fn from(links: Vec<String>) -> Self {
        Self(links.into_iter())
    }
}

impl Iterator for Links {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.0.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

/// A pagination control found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationControl {
    /// Where activating the control leads, when it carries a link
    pub target: Option<Url>,
}

/// Extracts all followable links from an HTML document
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same page anchors)
/// - Anything that is not http(s) after resolution
///
/// # Example
///
/// ```
/// use sumi_sweep::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<a href="/product/1">One</a><a href="mailto:x@y.z">Mail</a>"#;
/// let base = Url::parse("https://shop.example/category/1").unwrap();
/// let links: Vec<String> = extract_links(html, &base).collect();
/// assert_eq!(links, vec!["https://shop.example/product/1"]);
/// ```
pub fn extract_links(html: &str, base_url: &Url) -> Links {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            // Skip if it has the download attribute
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    Links::from(links)
}

/// Looks for the pagination control matching `selector`
///
/// The control's target is its own `href`, or the `href` of the first link
/// inside it.
pub fn find_next_page(html: &str, base_url: &Url, selector: &Selector) -> Option<PaginationControl> {
    let document = Html::parse_document(html);
    let control = document.select(selector).next()?;

    let target = control_href(control).and_then(|href| resolve_link(href, base_url));
    let target = target.and_then(|t| Url::parse(&t).ok());

    Some(PaginationControl { target })
}

fn control_href(control: ElementRef<'_>) -> Option<&str> {
    if let Some(href) = control.value().attr("href") {
        return Some(href);
    }

    let a_selector = Selector::parse("a[href]").ok()?;
    control
        .select(&a_selector)
        .next()
        .and_then(|a| a.value().attr("href"))
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    if href.starts_with('#') {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
