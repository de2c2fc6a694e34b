//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: lifecycle of a run (idle, running, draining, done)
//! - `VisitedSet`: the set of URLs already claimed for dispatch in this run

mod phase;
mod visited;

// Re-export main types
pub use phase::CrawlPhase;
pub use visited::VisitedSet;
