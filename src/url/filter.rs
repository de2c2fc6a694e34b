use crate::config::FilterConfig;
use crate::url::NormalizedUrl;

/// Decides which discovered links are worth following
///
/// A link passes when its path contains at least one of the configured
/// substrings (an empty list lets every path through) and, with
/// `same_host_only`, when it stays on the host of the page it was found on.
/// Seeds never go through this filter.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    path_patterns: Vec<String>,
    same_host_only: bool,
}

impl LinkFilter {
    pub fn new(path_patterns: Vec<String>, same_host_only: bool) -> Self {
        Self {
            path_patterns,
            same_host_only,
        }
    }

    pub fn from_config(config: &FilterConfig, same_host_only: bool) -> Self {
        Self::new(config.path_patterns.clone(), same_host_only)
    }

    /// Returns true if `link`, found on `source`, should be enqueued
    ///
    /// # Examples
    ///
    /// ```
    /// use sumi_sweep::url::{normalize_url, LinkFilter};
    ///
    /// let filter = LinkFilter::new(vec!["/category/".into(), "/product".into()], true);
    /// let page = normalize_url("https://shop.example/category/1").unwrap();
    ///
    /// let product = normalize_url("https://shop.example/products/7").unwrap();
    /// let about = normalize_url("https://shop.example/about").unwrap();
    /// let offsite = normalize_url("https://other.example/product/7").unwrap();
    ///
    /// assert!(filter.allows(&page, &product));
    /// assert!(!filter.allows(&page, &about));
    /// assert!(!filter.allows(&page, &offsite));
    /// ```
    pub fn allows(&self, source: &NormalizedUrl, link: &NormalizedUrl) -> bool {
        if self.same_host_only && source.host() != link.host() {
            return false;
        }
        self.matches_path(link.path())
    }

    /// Checks only the path allow-list
    pub fn matches_path(&self, path: &str) -> bool {
        self.path_patterns.is_empty() || self.path_patterns.iter().any(|p| path.contains(p.as_str()))
    }
}
