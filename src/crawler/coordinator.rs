//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! a sweep, including:
//! - Seeding the frontier
//! - Dispatching requests to a bounded pool of page workers
//! - Classifying and reporting statuses
//! - Walking pagination on each open page
//! - Feeding discovered links back into the frontier
//! - Handling stop requests and flushing the report

use crate::config::{validate, Config};
use crate::crawler::classify::classify;
use crate::crawler::fetcher::{
    fetch, HttpPageFetcher, HttpStatusProbe, PageFetcher, RenderedPage, StatusProbe,
};
use crate::crawler::frontier::{CrawlRequest, Enqueue, FrontierQueue};
use crate::output::{generate_markdown_summary, CrawlSummary, ReportSink, RunStats};
use crate::state::{CrawlPhase, VisitedSet};
use crate::url::{normalize_relative, normalize_url, LinkFilter, NormalizedUrl};
use crate::{FetchError, SweepError};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    context: Arc<WorkerContext>,
    frontier: FrontierQueue,
    phase: CrawlPhase,
    stats: RunStats,
    cancel: CancellationToken,
    config_hash: Option<String>,
}

/// Everything a page worker needs, shared by all workers of a run
struct WorkerContext {
    fetcher: Arc<dyn PageFetcher>,
    probe: Arc<dyn StatusProbe>,
    visited: Arc<VisitedSet>,
    sink: Arc<ReportSink>,
    filter: LinkFilter,
    max_depth: Option<u32>,
    navigation_timeout: Duration,
    pagination_timeout: Duration,
    pagination_cap: u32,
}

/// Link counters collected by one worker
#[derive(Debug, Default)]
struct LinkTally {
    discovered: usize,
    filtered: usize,
    invalid: usize,
    duplicate: usize,
    too_deep: usize,
}

/// What a worker hands back to the coordinator
struct PageOutcome {
    request: CrawlRequest,
    /// Links this worker claimed, in discovery order
    claimed: Vec<NormalizedUrl>,
    tally: LinkTally,
    fetch_failed: bool,
    pagination_steps: usize,
    pagination_cap_hit: bool,
}

impl Coordinator {
    /// Creates a coordinator using the built-in HTTP renderer and probe
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(SweepError::FatalStartup)` - No seeds, or a zero request budget
    /// * `Err(SweepError::BrowserLaunch)` - The renderer could not be prepared
    pub fn new(config: Config) -> Result<Self, SweepError> {
        check_startup(&config)?;

        let navigation_timeout = Duration::from_millis(config.crawler.navigation_timeout_ms);
        let fetcher = HttpPageFetcher::launch(&config.browser, navigation_timeout)?;
        let probe = HttpStatusProbe::new(fetcher.client().clone());

        Self::with_collaborators(config, Arc::new(fetcher), Arc::new(probe))
    }

    /// Creates a coordinator around the given renderer and status probe
    pub fn with_collaborators(
        config: Config,
        fetcher: Arc<dyn PageFetcher>,
        probe: Arc<dyn StatusProbe>,
    ) -> Result<Self, SweepError> {
        check_startup(&config)?;

        let crawler = &config.crawler;
        let context = WorkerContext {
            fetcher,
            probe,
            visited: Arc::new(VisitedSet::new()),
            sink: Arc::new(ReportSink::new()),
            filter: LinkFilter::from_config(&config.filter, crawler.same_host_only),
            max_depth: crawler.max_depth,
            navigation_timeout: Duration::from_millis(crawler.navigation_timeout_ms),
            pagination_timeout: Duration::from_millis(crawler.pagination_timeout_ms),
            pagination_cap: crawler.per_page_pagination_cap,
        };

        Ok(Self {
            frontier: FrontierQueue::new(crawler.max_requests_per_crawl as usize),
            config: Arc::new(config),
            context: Arc::new(context),
            phase: CrawlPhase::Idle,
            stats: RunStats::default(),
            cancel: CancellationToken::new(),
            config_hash: None,
        })
    }

    /// Attaches the configuration hash shown in the summary
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Replaces the run's cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops the run when cancelled
    ///
    /// After cancellation no new request is dispatched; in-flight pages
    /// finish or time out and the report is still written.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.context.visited
    }

    pub fn sink(&self) -> Arc<ReportSink> {
        Arc::clone(&self.context.sink)
    }

    /// Runs the crawl to completion
    ///
    /// The run ends when the frontier is empty with nothing in flight, when
    /// the request budget is dispatched and finished, or when the
    /// cancellation token fires, whichever happens first.
    pub async fn run(&mut self) -> Result<RunStats, SweepError> {
        if self.phase != CrawlPhase::Idle {
            return Err(SweepError::InvalidTransition {
                from: self.phase,
                to: CrawlPhase::Running,
            });
        }

        let started_at = Utc::now();
        let start_time = Instant::now();

        self.load_seeds()?;

        let mut workers: JoinSet<PageOutcome> = JoinSet::new();
        if self.cancel.is_cancelled() {
            tracing::info!("Stop requested before the first dispatch");
            self.stats.cancelled = true;
        } else {
            self.transition(CrawlPhase::Running)?;
            tracing::info!(
                "Crawl running: {} seeds queued, budget {} requests",
                self.frontier.len(),
                self.frontier.max_requests()
            );
            self.dispatch_loop(&mut workers).await;
        }

        self.transition(CrawlPhase::Draining)?;
        self.drain(&mut workers).await;

        self.stats.requests_dispatched = self.frontier.dispatched();
        self.stats.requests_dropped_by_budget = self.frontier.dropped_by_budget();
        self.stats.records_reported = self.context.sink.len();
        self.stats.duration = start_time.elapsed();

        self.flush(started_at)?;
        self.context.fetcher.shutdown().await;

        self.transition(CrawlPhase::Done)?;
        self.stats.log();
        tracing::info!(
            "Crawl completed: {} requests in {:?}",
            self.stats.requests_dispatched,
            self.stats.duration
        );

        Ok(self.stats.clone())
    }

    /// Normalizes, claims and enqueues the configured seeds
    fn load_seeds(&mut self) -> Result<(), SweepError> {
        let seeds = self.config.seeds.clone();

        for seed in &seeds {
            let url = match normalize_url(seed) {
                Ok(u) => u,
                Err(e) => {
                    tracing::warn!("Skipping invalid seed {}: {}", seed, e);
                    self.stats.invalid_links += 1;
                    continue;
                }
            };

            if !self.context.visited.try_claim(&url) {
                tracing::debug!("Seed {} already queued", url);
                self.stats.duplicate_links += 1;
                continue;
            }

            self.frontier.enqueue(CrawlRequest::seed(url));
        }

        if self.frontier.is_empty() {
            return Err(SweepError::FatalStartup(
                "no valid seed URL to start from".to_string(),
            ));
        }

        Ok(())
    }

    /// Main scheduling loop of the Running phase
    async fn dispatch_loop(&mut self, workers: &mut JoinSet<PageOutcome>) {
        let slots = Arc::new(Semaphore::new(
            self.config.crawler.max_concurrent_pages_open as usize,
        ));
        let cancel = self.cancel.clone();

        loop {
            if cancel.is_cancelled() {
                self.stats.cancelled = true;
                break;
            }

            self.fill_workers(workers, &slots);

            if workers.is_empty() {
                if self.frontier.budget_spent() {
                    tracing::info!(
                        "Request budget of {} reached",
                        self.frontier.max_requests()
                    );
                } else {
                    tracing::info!("Frontier is empty, crawl complete");
                }
                break;
            }

            let joined = tokio::select! {
                _ = cancel.cancelled() => None,
                joined = workers.join_next() => joined,
            };

            match joined {
                Some(result) => self.absorb(result, true),
                None => {
                    tracing::info!("Stop requested, draining {} in-flight pages", workers.len());
                    self.stats.cancelled = true;
                    break;
                }
            }
        }
    }

    /// Starts workers until the pool is full or the frontier has nothing to give
    fn fill_workers(&mut self, workers: &mut JoinSet<PageOutcome>, slots: &Arc<Semaphore>) {
        if !self.phase.accepts_dispatch() {
            return;
        }

        while let Ok(permit) = Arc::clone(slots).try_acquire_owned() {
            let Some(request) = self.frontier.dequeue() else {
                break;
            };

            let dispatched = self.frontier.dispatched();
            tracing::debug!(
                "Dispatching {} ({}, depth {})",
                request.url,
                request.kind,
                request.depth
            );
            if dispatched % 10 == 0 {
                tracing::info!(
                    "Progress: {} requests dispatched, {} in frontier, {} budget left, {} reported",
                    dispatched,
                    self.frontier.len(),
                    self.frontier.remaining_budget(),
                    self.context.sink.len()
                );
            }

            let context = Arc::clone(&self.context);
            workers.spawn(process_request(context, request, permit));
        }
    }

    /// Waits for in-flight workers without enqueuing anything new
    async fn drain(&mut self, workers: &mut JoinSet<PageOutcome>) {
        while let Some(result) = workers.join_next().await {
            self.absorb(result, false);
        }
    }

    /// Folds a finished worker into the run state
    fn absorb(&mut self, result: Result<PageOutcome, JoinError>, enqueue_links: bool) {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Page worker failed: {}", e);
                return;
            }
        };

        let tally = &outcome.tally;
        self.stats.links_discovered += tally.discovered;
        self.stats.links_filtered += tally.filtered;
        self.stats.invalid_links += tally.invalid;
        self.stats.duplicate_links += tally.duplicate;
        self.stats.links_too_deep += tally.too_deep;
        self.stats.pagination_steps += outcome.pagination_steps;
        if outcome.pagination_cap_hit {
            self.stats.pagination_caps_hit += 1;
        }
        if outcome.fetch_failed {
            self.stats.fetch_errors += 1;
        }

        if !enqueue_links {
            return;
        }

        let depth = outcome.request.depth + 1;
        for url in outcome.claimed {
            if self.frontier.enqueue(CrawlRequest::link(url, depth)) == Enqueue::Accepted {
                tracing::trace!("Queued link from {}", outcome.request.url);
            }
        }
    }

    /// Writes the report and optional summary
    fn flush(&self, started_at: chrono::DateTime<Utc>) -> Result<(), SweepError> {
        let report_path = Path::new(&self.config.output.report_path);
        let written = self.context.sink.persist(report_path)?;
        tracing::info!("Wrote {} records to {}", written, report_path.display());

        if let Some(summary_path) = &self.config.output.summary_path {
            let summary = CrawlSummary {
                started_at,
                finished_at: Utc::now(),
                config_hash: self.config_hash.clone(),
                seeds: self.config.seeds.clone(),
                max_requests: self.frontier.max_requests(),
                stats: self.stats.clone(),
                records: self.context.sink.records(),
            };
            generate_markdown_summary(&summary, Path::new(summary_path))?;
            tracing::info!("Summary written to {}", summary_path);
        }

        Ok(())
    }

    fn transition(&mut self, next: CrawlPhase) -> Result<(), SweepError> {
        if !self.phase.can_transition_to(next) {
            return Err(SweepError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::debug!("Crawl phase {} -> {}", self.phase, next);
        self.phase = next;
        Ok(())
    }
}

fn check_startup(config: &Config) -> Result<(), SweepError> {
    if config.seeds.is_empty() {
        return Err(SweepError::FatalStartup("seed list is empty".to_string()));
    }
    if config.crawler.max_requests_per_crawl == 0 {
        return Err(SweepError::FatalStartup(
            "max_requests_per_crawl must be greater than 0".to_string(),
        ));
    }
    validate(config)?;
    Ok(())
}

/// Processes one dispatched request
///
/// This function:
/// 1. Opens the page
/// 2. Classifies the status and reports it if worthy
/// 3. Extracts and claims links on every pagination state
/// 4. Closes the page
///
/// Transport failures fall back to the raw status probe. Nothing here is
/// retried and nothing here fails the run.
async fn process_request(
    context: Arc<WorkerContext>,
    request: CrawlRequest,
    _permit: OwnedSemaphorePermit,
) -> PageOutcome {
    let mut outcome = PageOutcome {
        request,
        claimed: Vec::new(),
        tally: LinkTally::default(),
        fetch_failed: false,
        pagination_steps: 0,
        pagination_cap_hit: false,
    };

    let result = fetch(
        context.fetcher.as_ref(),
        &outcome.request.url,
        context.navigation_timeout,
    )
    .await;

    let mut page = match (result.page, result.fetch_error) {
        (Some(page), _) => page,
        (None, error) => {
            outcome.fetch_failed = true;
            let error = error.unwrap_or_else(|| FetchError::Network {
                url: outcome.request.url.to_string(),
                message: "renderer returned no page".to_string(),
            });
            confirm_with_probe(&context, &outcome.request.url, &error).await;
            return outcome;
        }
    };

    let url = outcome.request.url.clone();
    let status = page.status_code();
    tracing::info!("Processing {} with status {}...", url, status);

    let classification = classify(status);
    if classification.report_worthy {
        context.sink.record(&url, status);
    }

    walk_pagination(&context, page.as_mut(), &mut outcome).await;
    page.close().await;

    outcome
}

/// Extracts links from the current page state, then follows "next page"
/// controls until there are none left or the per-page cap is reached
async fn walk_pagination(
    context: &WorkerContext,
    page: &mut dyn RenderedPage,
    outcome: &mut PageOutcome,
) {
    let cap = context.pagination_cap as usize;

    loop {
        collect_links(context, page, outcome);

        let check = tokio::time::timeout(context.pagination_timeout, page.has_next_page()).await;
        match check {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) => break,
            Ok(Err(e)) => {
                tracing::warn!("Pagination check failed on {}: {}", outcome.request.url, e);
                break;
            }
            Err(_) => {
                tracing::warn!(
                    "Pagination check on {} did not answer within {:?}",
                    outcome.request.url,
                    context.pagination_timeout
                );
                break;
            }
        }

        if outcome.pagination_steps >= cap {
            tracing::warn!(
                "Pagination cap of {} reached on {}",
                cap,
                outcome.request.url
            );
            outcome.pagination_cap_hit = true;
            break;
        }

        tracing::info!("Clicking pagination arrow on {}", outcome.request.url);
        let step = tokio::time::timeout(context.pagination_timeout, page.go_to_next_page()).await;

        match step {
            Ok(Ok(())) => outcome.pagination_steps += 1,
            Ok(Err(e)) => {
                tracing::warn!(
                    "Pagination stopped on {} ({}): {}",
                    outcome.request.url,
                    e.kind(),
                    e
                );
                break;
            }
            Err(_) => {
                tracing::warn!(
                    "Pagination stopped on {} (timeout): next page did not load within {:?}",
                    outcome.request.url,
                    context.pagination_timeout
                );
                break;
            }
        }
    }
}

/// Filters, normalizes and claims the links of the current page state
///
/// Links are judged against the page's current URL, which differs from the
/// requested one after a redirect or a pagination step.
fn collect_links(context: &WorkerContext, page: &dyn RenderedPage, outcome: &mut PageOutcome) {
    let source = normalize_url(page.url().as_str()).unwrap_or_else(|_| outcome.request.url.clone());
    let source = &source;
    let next_depth = outcome.request.depth + 1;

    for raw in page.extract_links() {
        outcome.tally.discovered += 1;

        let link = match normalize_relative(source, &raw) {
            Ok(link) => link,
            Err(e) => {
                tracing::debug!("Dropping link {} from {}: {}", raw, source, e);
                outcome.tally.invalid += 1;
                continue;
            }
        };

        if !context.filter.allows(source, &link) {
            tracing::trace!("Filtered out {}", link);
            outcome.tally.filtered += 1;
            continue;
        }

        if context.max_depth.is_some_and(|max| next_depth > max) {
            outcome.tally.too_deep += 1;
            continue;
        }

        if context.visited.try_claim(&link) {
            outcome.claimed.push(link);
        } else {
            outcome.tally.duplicate += 1;
        }
    }
}

/// Double-checks a URL whose render failed with a plain GET
///
/// Only a 4xx/5xx answer is reported; the page is never retried.
async fn confirm_with_probe(context: &WorkerContext, url: &NormalizedUrl, error: &FetchError) {
    tracing::warn!("Fetch failed for {} ({}): {}", url, error.kind(), error);

    match context.probe.raw_get(url.as_url()).await {
        Ok(status) if classify(status).report_worthy => {
            tracing::info!("Processing {} with status {} (raw check)...", url, status);
            context.sink.record(url, status);
        }
        Ok(status) => {
            tracing::info!(
                "Raw check of {} answered {}; not reported",
                url,
                status
            );
        }
        Err(e) => {
            tracing::warn!("Raw check failed for {} ({}): {}", url, e.kind(), e);
        }
    }
}

/// Runs a complete sweep with the built-in renderer
///
/// The run is stopped cleanly when `cancel` fires.
///
/// # Example
///
/// ```no_run
/// use sumi_sweep::config::load_config;
/// use sumi_sweep::crawler::run_crawl;
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("sweep.toml"))?;
/// let stats = run_crawl(config, None, CancellationToken::new()).await?;
/// println!("{} error pages", stats.records_reported);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: Config,
    config_hash: Option<String>,
    cancel: CancellationToken,
) -> Result<RunStats, SweepError> {
    let mut coordinator = Coordinator::new(config)?.with_cancellation(cancel);
    if let Some(hash) = config_hash {
        coordinator = coordinator.with_config_hash(hash);
    }

    coordinator.run().await
}
