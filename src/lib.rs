//! Sumi-Sweep: a breadth-first error-status crawler
//!
//! This crate crawls a site from a set of seed URLs, follows in-page links
//! and pagination controls, and reports every visited URL that answered with
//! a 4xx or 5xx status code.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Cannot start crawl: {0}")]
    FatalStartup(String),

    #[error("Failed to launch {engine} renderer: {message}")]
    BrowserLaunch { engine: String, message: String },

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Invalid phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlPhase,
        to: state::CrawlPhase,
    },

    #[error("Failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Per-request failures reported by a page renderer or status probe
///
/// These never abort a run; the coordinator logs them and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Timed out waiting for {url}")]
    Timeout { url: String },

    #[error("Navigation failed on {url}: {message}")]
    Navigation { url: String, message: String },
}

impl FetchError {
    /// Short label used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::Timeout { .. } => "timeout",
            Self::Navigation { .. } => "navigation",
        }
    }
}

/// Result type alias for Sumi-Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Coordinator;
pub use output::{ReportRecord, ReportSink, RunStats};
pub use state::{CrawlPhase, VisitedSet};
pub use crate::url::{normalize_url, NormalizedUrl};
