//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Status classification
//! - The budget-bounded frontier
//! - Page rendering behind the fetcher traits
//! - HTML link and pagination extraction
//! - Overall crawl coordination

mod classify;
mod coordinator;
mod fetcher;
mod frontier;
mod parser;

pub use classify::{classify, is_report_worthy, Classification, StatusCategory};
pub use coordinator::{run_crawl, Coordinator};
pub use fetcher::{
    build_http_client, fetch, FetchResult, HttpPageFetcher, HttpStatusProbe, PageFetcher,
    RenderedPage, StatusProbe,
};
pub use frontier::{CrawlRequest, Enqueue, FrontierQueue, RequestKind};
pub use parser::{extract_links, find_next_page, Links, PaginationControl};

use crate::config::Config;
use crate::output::RunStats;
use crate::SweepError;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Prepare the renderer and status probe
/// 2. Seed the frontier
/// 3. Fetch pages and walk their pagination
/// 4. Follow filtered links while the budget lasts
/// 5. Write the report and optional summary
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(RunStats)` - Crawl completed
/// * `Err(SweepError)` - Crawl could not start or its report could not be written
pub async fn crawl(config: Config) -> Result<RunStats, SweepError> {
    run_crawl(config, None, CancellationToken::new()).await
}
