//! Run statistics
//!
//! Counters collected by the coordinator during a run and surfaced at the
//! end of it.

use serde::Serialize;
use std::time::Duration;

/// Final statistics of a crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    /// Requests taken from the frontier and sent to the renderer
    pub requests_dispatched: usize,

    /// Records in the report
    pub records_reported: usize,

    /// Claimed URLs the frontier rejected because the budget was committed
    pub requests_dropped_by_budget: usize,

    /// Candidate links seen on rendered pages, before any filtering
    pub links_discovered: usize,

    /// Links rejected by the path or host filter
    pub links_filtered: usize,

    /// Links that could not be normalized
    pub invalid_links: usize,

    /// Links whose URL was already claimed
    pub duplicate_links: usize,

    /// Links beyond the configured maximum depth
    pub links_too_deep: usize,

    /// Dispatches that failed at the transport level
    pub fetch_errors: usize,

    /// "Next page" steps taken across all pages
    pub pagination_steps: usize,

    /// Pages whose pagination stopped at the per-page cap
    pub pagination_caps_hit: usize,

    /// True if the run was stopped from outside
    pub cancelled: bool,

    /// Wall-clock duration of the run
    #[serde(skip)]
    pub duration: Duration,
}

impl RunStats {
    /// Share of dispatched requests that ended up in the report, in percent
    pub fn error_rate(&self) -> f64 {
        if self.requests_dispatched == 0 {
            return 0.0;
        }
        (self.records_reported as f64 / self.requests_dispatched as f64) * 100.0
    }

    /// Emits the final statistics line through `tracing`
    pub fn log(&self) {
        tracing::info!(
            "Final request statistics: requestsDispatched={}, recordsReported={}, requestsDroppedByBudget={}",
            self.requests_dispatched,
            self.records_reported,
            self.requests_dropped_by_budget
        );
        tracing::debug!(
            "Links: discovered={}, filtered={}, invalid={}, duplicate={}, too_deep={}; fetch_errors={}, pagination_steps={}, pagination_caps_hit={}",
            self.links_discovered,
            self.links_filtered,
            self.invalid_links,
            self.duplicate_links,
            self.links_too_deep,
            self.fetch_errors,
            self.pagination_steps,
            self.pagination_caps_hit
        );
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RunStats) {
    println!("=== Sweep Statistics ===\n");

    println!("Requests:");
    println!("  Dispatched: {}", stats.requests_dispatched);
    println!("  Dropped by budget: {}", stats.requests_dropped_by_budget);
    println!("  Fetch errors: {}", stats.fetch_errors);
    println!();

    println!("Links:");
    println!("  Discovered: {}", stats.links_discovered);
    println!("  Filtered out: {}", stats.links_filtered);
    println!("  Invalid: {}", stats.invalid_links);
    println!("  Already claimed: {}", stats.duplicate_links);
    println!("  Too deep: {}", stats.links_too_deep);
    println!();

    println!("Pagination:");
    println!("  Steps: {}", stats.pagination_steps);
    println!("  Pages stopped at cap: {}", stats.pagination_caps_hit);
    println!();

    println!(
        "Reported: {} ({:.1}% of dispatched requests){}",
        stats.records_reported,
        stats.error_rate(),
        if stats.cancelled { " [stopped early]" } else { "" }
    );
}
