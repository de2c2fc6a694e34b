//! URL handling module for Sumi-Sweep
//!
//! This module provides URL normalization (the deduplication key of a crawl)
//! and the predicate deciding which discovered links are followed.

mod filter;
mod normalize;

// Re-export main types and functions
pub use filter::LinkFilter;
pub use normalize::{normalize_relative, normalize_url, NormalizedUrl};
