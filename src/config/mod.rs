//! Configuration module for Sumi-Sweep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_sweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sweep.toml")).unwrap();
//! println!("Request budget: {}", config.crawler.max_requests_per_crawl);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BrowserConfig, BrowserEngine, Config, CrawlerConfig, FilterConfig, OutputConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
