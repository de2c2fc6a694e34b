//! Sumi-Sweep main entry point
//!
//! This is the command-line interface for the Sumi-Sweep error-page crawler.

use clap::Parser;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use sumi_sweep::config::{load_config_with_hash, validate, Config};
use sumi_sweep::crawler::run_crawl;
use sumi_sweep::normalize_url;
use sumi_sweep::output::print_statistics;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Sumi-Sweep: find the pages of a site that answer with an error
///
/// Sumi-Sweep crawls a site from its seed URLs, walks pagination controls,
/// follows category and product links, and writes every URL that returned
/// a 4xx or 5xx status to a JSON report.
#[derive(Parser, Debug)]
#[command(name = "sumi-sweep")]
#[command(version = "1.0.0")]
#[command(about = "An error-status site crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Override max-requests-per-crawl from the config file
    #[arg(long, value_name = "N")]
    max_requests: Option<u32>,

    /// Override the report path from the config file
    #[arg(long, value_name = "PATH")]
    report: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load and validate configuration
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(max_requests) = cli.max_requests {
        config.crawler.max_requests_per_crawl = max_requests;
    }
    if let Some(report) = &cli.report {
        config.output.report_path = report.clone();
    }
    validate(&config)?;

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet, config.output.log_dir.as_deref())?;
    tracing::info!(
        "Configuration loaded from {} (hash: {})",
        cli.config.display(),
        config_hash
    );

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// When `log_dir` is given, events are also written to a timestamped file
/// in that directory.
fn setup_logging(verbose: u8, quiet: bool, log_dir: Option<&str>) -> std::io::Result<()> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_sweep=info,warn"),
            1 => EnvFilter::new("sumi_sweep=debug,info"),
            2 => EnvFilter::new("sumi_sweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let name = format!("sweep-{}.log", chrono::Local::now().format("%Y%m%d-%H%M%S"));
            let file = File::create(Path::new(dir).join(name))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false),
        )
        .with(file_layer)
        .init();

    Ok(())
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Sweep Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Max requests per crawl: {}",
        config.crawler.max_requests_per_crawl
    );
    println!(
        "  Max concurrent pages: {}",
        config.crawler.max_concurrent_pages_open
    );
    println!(
        "  Pagination cap per page: {}",
        config.crawler.per_page_pagination_cap
    );
    println!(
        "  Navigation timeout: {}ms",
        config.crawler.navigation_timeout_ms
    );
    match config.crawler.max_depth {
        Some(depth) => println!("  Max depth: {}", depth),
        None => println!("  Max depth: unbounded"),
    }
    println!("  Same host only: {}", config.crawler.same_host_only);

    println!("\nBrowser:");
    println!("  Engine: {}", config.browser.engine);
    println!("  Headless: {}", config.browser.headless);
    println!("  Pagination selector: {}", config.browser.pagination_selector);

    println!("\nLink Filter:");
    if config.filter.path_patterns.is_empty() {
        println!("  (all paths)");
    }
    for pattern in &config.filter.path_patterns {
        println!("  - {}", pattern);
    }

    println!("\nOutput:");
    println!("  Report: {}", config.output.report_path);
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary);
    }
    if let Some(log_dir) = &config.output.log_dir {
        println!("  Log directory: {}", log_dir);
    }

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        match normalize_url(seed) {
            Ok(url) => println!("  * {}", url),
            Err(e) => println!("  ! {} ({})", seed, e),
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Starting sweep: {} seeds, budget {} requests, report at {}",
        config.seeds.len(),
        config.crawler.max_requests_per_crawl,
        config.output.report_path
    );

    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight pages");
            stop.cancel();
        }
    });

    match run_crawl(config, Some(config_hash), cancel).await {
        Ok(stats) => {
            print_statistics(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
