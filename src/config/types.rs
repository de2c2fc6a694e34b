use serde::Deserialize;

/// Main configuration structure for Sumi-Sweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Seed URLs, in the order they are loaded into the frontier
    #[serde(default)]
    pub seeds: Vec<String>,
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Hard cap on dispatched requests for the whole run
    #[serde(rename = "max-requests-per-crawl")]
    pub max_requests_per_crawl: u32,

    /// Maximum number of pages open at the same time
    #[serde(rename = "max-concurrent-pages-open", default = "default_concurrency")]
    pub max_concurrent_pages_open: u32,

    /// Maximum number of "next page" steps taken on a single fetched page
    #[serde(rename = "per-page-pagination-cap", default = "default_pagination_cap")]
    pub per_page_pagination_cap: u32,

    /// Navigation (render) timeout in milliseconds
    #[serde(rename = "navigation-timeout-ms", default = "default_navigation_timeout")]
    pub navigation_timeout_ms: u64,

    /// Wait bound for a pagination step in milliseconds
    #[serde(rename = "pagination-timeout-ms", default = "default_pagination_timeout")]
    pub pagination_timeout_ms: u64,

    /// Maximum link depth from the seeds (unbounded when absent)
    #[serde(rename = "max-depth", default)]
    pub max_depth: Option<u32>,

    /// Only follow links that stay on the host of the page they were found on
    #[serde(rename = "same-host-only", default = "default_true")]
    pub same_host_only: bool,
}

/// Renderer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    #[serde(default)]
    pub engine: BrowserEngine,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// CSS selector of the "next page" control
    #[serde(rename = "pagination-selector", default = "default_pagination_selector")]
    pub pagination_selector: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            engine: BrowserEngine::default(),
            headless: true,
            pagination_selector: default_pagination_selector(),
        }
    }
}

/// Browser engine the renderer should emulate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserEngine {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chromium => "chromium",
            Self::Firefox => "firefox",
            Self::Webkit => "webkit",
        }
    }
}

impl std::fmt::Display for BrowserEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Link filtering configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// A discovered link is followed only if its path contains one of these
    /// substrings. An empty list follows every link.
    #[serde(rename = "path-patterns", default = "default_path_patterns")]
    pub path_patterns: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            path_patterns: default_path_patterns(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the JSON report written at the end of the run
    #[serde(rename = "report-path")]
    pub report_path: String,

    /// Path of the optional markdown summary
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,

    /// Directory for the per-run log file
    #[serde(rename = "log-dir", default)]
    pub log_dir: Option<String>,
}

fn default_concurrency() -> u32 {
    4
}

fn default_pagination_cap() -> u32 {
    10
}

fn default_navigation_timeout() -> u64 {
    30_000
}

fn default_pagination_timeout() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

fn default_pagination_selector() -> String {
    "div.arrow.right".to_string()
}

fn default_path_patterns() -> Vec<String> {
    vec!["/category/".to_string(), "/product".to_string()]
}
