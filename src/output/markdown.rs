//! Markdown summary generation
//!
//! This module generates a human-readable markdown summary of a sweep:
//! run information, request statistics and the table of error pages.

use crate::output::sink::ReportRecord;
use crate::output::stats::RunStats;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Everything the markdown summary shows about a run
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config_hash: Option<String>,
    pub seeds: Vec<String>,
    pub max_requests: usize,
    pub stats: RunStats,
    pub records: Vec<ReportRecord>,
}

/// Writes the markdown summary of `summary` to `output_path`
pub fn generate_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> std::io::Result<()> {
    let markdown = format_markdown_summary(summary);

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl summary as markdown
pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let stats = &summary.stats;
    let mut md = String::new();

    md.push_str("# Sumi-Sweep Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", summary.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", summary.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {:.2} seconds\n",
        stats.duration.as_secs_f64()
    ));
    md.push_str(&format!(
        "- **Status**: {}\n",
        if stats.cancelled { "stopped" } else { "completed" }
    ));
    if let Some(hash) = &summary.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push_str(&format!("- **Request Budget**: {}\n\n", summary.max_requests));

    md.push_str("### Seeds\n\n");
    for seed in &summary.seeds {
        md.push_str(&format!("- {}\n", seed));
    }
    md.push('\n');

    // Overall statistics
    md.push_str("## Request Statistics\n\n");
    md.push_str("| Metric | Count |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Dispatched | {} |\n", stats.requests_dispatched));
    md.push_str(&format!("| Reported | {} |\n", stats.records_reported));
    md.push_str(&format!(
        "| Dropped by budget | {} |\n",
        stats.requests_dropped_by_budget
    ));
    md.push_str(&format!("| Fetch errors | {} |\n", stats.fetch_errors));
    md.push_str(&format!("| Links discovered | {} |\n", stats.links_discovered));
    md.push_str(&format!("| Links filtered | {} |\n", stats.links_filtered));
    md.push_str(&format!("| Invalid links | {} |\n", stats.invalid_links));
    md.push_str(&format!("| Pagination steps | {} |\n\n", stats.pagination_steps));
    md.push_str(&format!("- **Error Rate**: {:.2}%\n\n", stats.error_rate()));

    // Status breakdown
    if !summary.records.is_empty() {
        let mut by_status: BTreeMap<u16, usize> = BTreeMap::new();
        for record in &summary.records {
            *by_status.entry(record.status_code).or_default() += 1;
        }

        md.push_str("## Status Breakdown\n\n");
        md.push_str("| Status | Pages |\n");
        md.push_str("|--------|-------|\n");
        for (status, count) in by_status {
            md.push_str(&format!("| {} | {} |\n", status, count));
        }
        md.push('\n');

        md.push_str("## Error Pages\n\n");
        md.push_str("| URL | Status | Time |\n");
        md.push_str("|-----|--------|------|\n");
        for record in &summary.records {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                record.url,
                record.status_code,
                record.timestamp.format("%Y-%m-%d %H:%M:%S")
            ));
        }
        md.push('\n');
    } else {
        md.push_str("No error pages found.\n");
    }

    md
}
