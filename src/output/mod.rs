//! Output module for crawl reports and summaries
//!
//! This module handles:
//! - Collecting report-worthy records and persisting them as JSON
//! - Run statistics
//! - Generating markdown summaries of a run

mod markdown;
mod sink;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary, CrawlSummary};
pub use sink::{load_report, ReportRecord, ReportSink};
pub use stats::{print_statistics, RunStats};
