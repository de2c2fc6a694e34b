//! Integration tests for the crawler
//!
//! Most tests run the coordinator against a scripted in-memory site; the
//! last ones use wiremock to test the full crawl cycle end-to-end over HTTP.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sumi_sweep::config::{BrowserConfig, Config, CrawlerConfig, FilterConfig, OutputConfig};
use sumi_sweep::crawler::{Coordinator, Links, PageFetcher, RenderedPage, StatusProbe};
use sumi_sweep::output::load_report;
use sumi_sweep::{CrawlPhase, FetchError};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// How a scripted page answers a "next page" click
#[derive(Clone, Copy, PartialEq, Eq)]
enum NextStep {
    Advance,
    Fail,
    /// Never finishes loading
    Hang,
}

/// One page of the scripted site
#[derive(Clone)]
struct ScriptedPage {
    status: u16,
    /// Links shown on each pagination state, first state first
    states: Vec<Vec<String>>,
    /// Keep offering a "next" control after the last state
    endless: bool,
    next_step: NextStep,
}

impl ScriptedPage {
    fn new(status: u16, links: &[&str]) -> Self {
        Self {
            status,
            states: vec![links.iter().map(|l| l.to_string()).collect()],
            endless: false,
            next_step: NextStep::Advance,
        }
    }

    fn paginated(status: u16, states: &[&[&str]]) -> Self {
        Self {
            status,
            states: states
                .iter()
                .map(|links| links.iter().map(|l| l.to_string()).collect())
                .collect(),
            endless: false,
            next_step: NextStep::Advance,
        }
    }

    fn endless(mut self) -> Self {
        self.endless = true;
        self
    }

    fn next_step(mut self, step: NextStep) -> Self {
        self.next_step = step;
        self
    }
}

/// In-memory site that records how often each URL was opened
#[derive(Default)]
struct ScriptedSite {
    pages: HashMap<String, ScriptedPage>,
    opened: Mutex<Vec<String>>,
    /// Cancelled as soon as the first page is opened
    stop_on_open: Option<CancellationToken>,
}

impl ScriptedSite {
    fn with_pages(pages: Vec<(&str, ScriptedPage)>) -> Self {
        Self {
            pages: pages
                .into_iter()
                .map(|(url, page)| (url.to_string(), page))
                .collect(),
            ..Self::default()
        }
    }

    fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    fn open_count(&self, url: &str) -> usize {
        self.opened().iter().filter(|u| u.as_str() == url).count()
    }
}

struct SiteFetcher(Arc<ScriptedSite>);

#[async_trait]
impl PageFetcher for SiteFetcher {
    async fn open(&self, url: &Url) -> Result<Box<dyn RenderedPage>, FetchError> {
        self.0.opened.lock().unwrap().push(url.to_string());
        if let Some(token) = &self.0.stop_on_open {
            token.cancel();
        }

        // Let other workers interleave
        tokio::task::yield_now().await;

        let page = self.0.pages.get(url.as_str()).ok_or_else(|| FetchError::Network {
            url: url.to_string(),
            message: "connection refused".to_string(),
        })?;

        Ok(Box::new(OpenPage {
            url: url.clone(),
            page: page.clone(),
            state: 0,
        }))
    }
}

struct OpenPage {
    url: Url,
    page: ScriptedPage,
    state: usize,
}

#[async_trait]
impl RenderedPage for OpenPage {
    fn url(&self) -> &Url {
        &self.url
    }

    fn status_code(&self) -> u16 {
        self.page.status
    }

    fn extract_links(&self) -> Links {
        let index = self.state.min(self.page.states.len().saturating_sub(1));
        Links::from(self.page.states.get(index).cloned().unwrap_or_default())
    }

    async fn has_next_page(&mut self) -> Result<bool, FetchError> {
        Ok(self.page.endless || self.state + 1 < self.page.states.len())
    }

    async fn go_to_next_page(&mut self) -> Result<(), FetchError> {
        match self.page.next_step {
            NextStep::Advance => {}
            NextStep::Fail => {
                return Err(FetchError::Navigation {
                    url: self.url.to_string(),
                    message: "pagination arrow detached".to_string(),
                })
            }
            NextStep::Hang => tokio::time::sleep(Duration::from_secs(30)).await,
        }

        if self.state + 1 < self.page.states.len() {
            self.state += 1;
        }
        Ok(())
    }

    async fn close(self: Box<Self>) {}
}

/// Probe answering from a fixed table
#[derive(Default)]
struct TableProbe(HashMap<String, u16>);

#[async_trait]
impl StatusProbe for TableProbe {
    async fn raw_get(&self, url: &Url) -> Result<u16, FetchError> {
        self.0.get(url.as_str()).copied().ok_or_else(|| FetchError::Network {
            url: url.to_string(),
            message: "unreachable".to_string(),
        })
    }
}

/// Creates a test configuration with the given seeds and budget
fn create_test_config(seeds: &[&str], max_requests: u32, dir: &TempDir) -> Config {
    Config {
        seeds: seeds.iter().map(|s| s.to_string()).collect(),
        crawler: CrawlerConfig {
            max_requests_per_crawl: max_requests,
            max_concurrent_pages_open: 1,
            per_page_pagination_cap: 10,
            navigation_timeout_ms: 2_000,
            pagination_timeout_ms: 2_000,
            max_depth: None,
            same_host_only: true,
        },
        browser: BrowserConfig::default(),
        filter: FilterConfig::default(),
        output: OutputConfig {
            report_path: dir.path().join("results.json").display().to_string(),
            summary_path: None,
            log_dir: None,
        },
    }
}

fn coordinator(config: Config, site: &Arc<ScriptedSite>, probe: TableProbe) -> Coordinator {
    Coordinator::with_collaborators(
        config,
        Arc::new(SiteFetcher(Arc::clone(site))),
        Arc::new(probe),
    )
    .expect("Failed to create coordinator")
}

#[tokio::test]
async fn test_category_with_one_missing_product() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(ScriptedSite::with_pages(vec![
        (
            "http://site/category/1",
            ScriptedPage::new(
                200,
                &[
                    "http://site/product/1",
                    "http://site/product/2",
                    "http://site/product/3",
                ],
            ),
        ),
        ("http://site/product/1", ScriptedPage::new(200, &[])),
        ("http://site/product/2", ScriptedPage::new(404, &[])),
        ("http://site/product/3", ScriptedPage::new(200, &[])),
    ]));

    let config = create_test_config(&["http://site/category/1"], 5, &dir);
    let mut crawler = coordinator(config, &site, TableProbe::default());
    let stats = crawler.run().await.expect("Crawl failed");

    assert_eq!(stats.requests_dispatched, 4);
    assert_eq!(stats.records_reported, 1);
    assert_eq!(stats.requests_dropped_by_budget, 0);
    assert_eq!(crawler.phase(), CrawlPhase::Done);

    let records = load_report(&dir.path().join("results.json")).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, "http://site/product/2");
    assert_eq!(records[0].status_code, 404);
}

#[tokio::test]
async fn test_equivalent_seeds_dispatch_once() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(ScriptedSite::with_pages(vec![(
        "http://site/a",
        ScriptedPage::new(200, &[]),
    )]));

    let config = create_test_config(&["http://site/a", "http://site/a/"], 10, &dir);
    let mut crawler = coordinator(config, &site, TableProbe::default());
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.requests_dispatched, 1);
    assert_eq!(site.opened(), vec!["http://site/a"]);
}

#[tokio::test]
async fn test_budget_of_one_drops_discovered_links() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(ScriptedSite::with_pages(vec![(
        "http://site/x",
        ScriptedPage::new(
            200,
            &[
                "http://site/product/1",
                "http://site/product/2",
                "http://site/product/3",
                "http://site/product/4",
                "http://site/product/5",
            ],
        ),
    )]));

    let config = create_test_config(&["http://site/x"], 1, &dir);
    let mut crawler = coordinator(config, &site, TableProbe::default());
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.requests_dispatched, 1);
    assert_eq!(stats.links_discovered, 5);
    assert_eq!(stats.requests_dropped_by_budget, 5);
    assert_eq!(site.opened().len(), 1);
}

#[tokio::test]
async fn test_duplicate_links_dispatch_once() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(ScriptedSite::with_pages(vec![
        (
            "http://site/category/1",
            ScriptedPage::new(
                200,
                &[
                    "http://site/product/1",
                    "http://site/product/1/",
                    "http://site/product/1#reviews",
                    "http://SITE/product/1",
                    "http://site/category/1",
                ],
            ),
        ),
        (
            "http://site/product/1",
            ScriptedPage::new(200, &["http://site/category/1/", "http://site/product/1"]),
        ),
    ]));

    let config = create_test_config(&["http://site/category/1"], 50, &dir);
    let mut crawler = coordinator(config, &site, TableProbe::default());
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.requests_dispatched, 2);
    assert_eq!(site.open_count("http://site/category/1"), 1);
    assert_eq!(site.open_count("http://site/product/1"), 1);
    assert_eq!(stats.duplicate_links, 6);
}

#[tokio::test]
async fn test_dispatch_never_exceeds_budget() {
    let dir = TempDir::new().unwrap();

    // A chain of category pages, each linking to the next and to two products
    let mut pages = Vec::new();
    let urls: Vec<String> = (0..30).map(|i| format!("http://site/category/{}", i)).collect();
    let product_links: Vec<Vec<String>> = (0..30)
        .map(|i| {
            vec![
                format!("http://site/category/{}", i + 1),
                format!("http://site/product/{}a", i),
                format!("http://site/product/{}b", i),
            ]
        })
        .collect();
    for (url, links) in urls.iter().zip(&product_links) {
        let links: Vec<&str> = links.iter().map(String::as_str).collect();
        pages.push((url.as_str(), ScriptedPage::new(200, &links)));
    }

    let site = Arc::new(ScriptedSite::with_pages(pages));
    let mut config = create_test_config(&["http://site/category/0"], 7, &dir);
    config.crawler.max_concurrent_pages_open = 3;

    let mut crawler = coordinator(config, &site, TableProbe::default());
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.requests_dispatched, 7);
    assert_eq!(site.opened().len(), 7);
    assert_eq!(crawler.phase(), CrawlPhase::Done);
}

#[tokio::test]
async fn test_report_only_contains_error_statuses() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(ScriptedSite::with_pages(vec![
        (
            "http://site/category/all",
            ScriptedPage::new(
                200,
                &[
                    "http://site/product/302",
                    "http://site/product/399",
                    "http://site/product/400",
                    "http://site/product/599",
                    "http://site/product/600",
                ],
            ),
        ),
        ("http://site/product/302", ScriptedPage::new(302, &[])),
        ("http://site/product/399", ScriptedPage::new(399, &[])),
        ("http://site/product/400", ScriptedPage::new(400, &[])),
        ("http://site/product/599", ScriptedPage::new(599, &[])),
        ("http://site/product/600", ScriptedPage::new(600, &[])),
    ]));

    let config = create_test_config(&["http://site/category/all"], 20, &dir);
    let mut crawler = coordinator(config, &site, TableProbe::default());
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.requests_dispatched, 6);

    let records = load_report(&dir.path().join("results.json")).unwrap();
    let codes: Vec<u16> = records.iter().map(|r| r.status_code).collect();
    assert_eq!(codes, vec![400, 599]);
    assert!(records
        .iter()
        .all(|r| (400..600).contains(&r.status_code)));
}

#[tokio::test]
async fn test_endless_pagination_is_capped() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(ScriptedSite::with_pages(vec![(
        "http://site/category/loop",
        ScriptedPage::new(200, &["http://site/category/loop"]).endless(),
    )]));

    let mut config = create_test_config(&["http://site/category/loop"], 10, &dir);
    config.crawler.per_page_pagination_cap = 4;

    let mut crawler = coordinator(config, &site, TableProbe::default());
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.requests_dispatched, 1);
    assert_eq!(stats.pagination_steps, 4);
    assert_eq!(stats.pagination_caps_hit, 1);
    assert_eq!(site.open_count("http://site/category/loop"), 1);
}

#[tokio::test]
async fn test_links_collected_from_every_pagination_state() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(ScriptedSite::with_pages(vec![
        (
            "http://site/category/shoes",
            ScriptedPage::paginated(
                200,
                &[
                    &["http://site/product/1"],
                    &["http://site/product/2"],
                    &["http://site/product/3"],
                ],
            ),
        ),
        ("http://site/product/1", ScriptedPage::new(200, &[])),
        ("http://site/product/2", ScriptedPage::new(500, &[])),
        ("http://site/product/3", ScriptedPage::new(404, &[])),
    ]));

    let config = create_test_config(&["http://site/category/shoes"], 10, &dir);
    let mut crawler = coordinator(config, &site, TableProbe::default());
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.requests_dispatched, 4);
    assert_eq!(stats.pagination_steps, 2);
    assert_eq!(stats.pagination_caps_hit, 0);

    let records = crawler.sink().records();
    let urls: Vec<&str> = records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, vec!["http://site/product/2", "http://site/product/3"]);
}

#[tokio::test]
async fn test_filter_applies_to_links_not_seeds() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(ScriptedSite::with_pages(vec![
        (
            "http://site/",
            ScriptedPage::new(
                404,
                &[
                    "http://site/about",
                    "http://site/blog/post",
                    "http://site/category/2",
                    "http://elsewhere/category/3",
                ],
            ),
        ),
        ("http://site/category/2", ScriptedPage::new(200, &[])),
    ]));

    let config = create_test_config(&["http://site/"], 10, &dir);
    let mut crawler = coordinator(config, &site, TableProbe::default());
    let stats = crawler.run().await.unwrap();

    assert_eq!(site.opened(), vec!["http://site/", "http://site/category/2"]);
    assert_eq!(stats.links_filtered, 3);
    assert_eq!(stats.records_reported, 1);
}

#[tokio::test]
async fn test_max_depth_limits_links() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(ScriptedSite::with_pages(vec![
        (
            "http://site/category/0",
            ScriptedPage::new(200, &["http://site/category/1"]),
        ),
        (
            "http://site/category/1",
            ScriptedPage::new(200, &["http://site/category/2"]),
        ),
        (
            "http://site/category/2",
            ScriptedPage::new(200, &["http://site/category/3"]),
        ),
    ]));

    let mut config = create_test_config(&["http://site/category/0"], 10, &dir);
    config.crawler.max_depth = Some(1);

    let mut crawler = coordinator(config, &site, TableProbe::default());
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.requests_dispatched, 2);
    assert_eq!(stats.links_too_deep, 1);
}

#[tokio::test]
async fn test_fetch_error_falls_back_to_probe() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(ScriptedSite::with_pages(vec![(
        "http://site/category/1",
        ScriptedPage::new(
            200,
            &[
                "http://site/product/broken",
                "http://site/product/flaky",
                "http://site/product/ok",
            ],
        ),
    )]));
    let probe = TableProbe(HashMap::from([
        ("http://site/product/broken".to_string(), 502),
        ("http://site/product/ok".to_string(), 200),
    ]));

    let config = create_test_config(&["http://site/category/1"], 10, &dir);
    let mut crawler = coordinator(config, &site, probe);
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.requests_dispatched, 4);
    assert_eq!(stats.fetch_errors, 3);
    assert_eq!(stats.records_reported, 1);

    // Each failed URL is tried exactly once
    assert_eq!(site.open_count("http://site/product/broken"), 1);
    assert_eq!(site.open_count("http://site/product/flaky"), 1);

    let records = crawler.sink().records();
    assert_eq!(records[0].url, "http://site/product/broken");
    assert_eq!(records[0].status_code, 502);
}

async fn run_with_broken_pagination(step: NextStep) -> sumi_sweep::RunStats {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(ScriptedSite::with_pages(vec![
        (
            "http://site/category/1",
            ScriptedPage::paginated(
                200,
                &[
                    &["http://site/product/1", "http://site/product/2"],
                    &["http://site/product/3"],
                ],
            )
            .next_step(step),
        ),
        ("http://site/product/1", ScriptedPage::new(404, &[])),
        ("http://site/product/2", ScriptedPage::new(200, &[])),
        ("http://site/product/3", ScriptedPage::new(500, &[])),
    ]));

    let mut config = create_test_config(&["http://site/category/1"], 10, &dir);
    config.crawler.pagination_timeout_ms = 100;

    let mut crawler = coordinator(config, &site, TableProbe::default());
    let stats = tokio::time::timeout(Duration::from_secs(10), crawler.run())
        .await
        .expect("Crawl did not finish")
        .expect("Crawl failed");

    assert_eq!(crawler.phase(), CrawlPhase::Done);
    assert_eq!(site.open_count("http://site/product/3"), 0);
    let reported: Vec<String> = crawler.sink().records().into_iter().map(|r| r.url).collect();
    assert_eq!(reported, vec!["http://site/product/1"]);
    stats
}

#[tokio::test]
async fn test_failed_pagination_step_keeps_earlier_links() {
    let stats = run_with_broken_pagination(NextStep::Fail).await;

    assert_eq!(stats.requests_dispatched, 3);
    assert_eq!(stats.pagination_steps, 0);
    assert_eq!(stats.pagination_caps_hit, 0);
}

#[tokio::test]
async fn test_stalled_pagination_step_times_out() {
    let stats = run_with_broken_pagination(NextStep::Hang).await;

    assert_eq!(stats.requests_dispatched, 3);
    assert_eq!(stats.pagination_steps, 0);
}

#[tokio::test]
async fn test_malformed_link_is_dropped() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(ScriptedSite::with_pages(vec![
        (
            "http://site/category/1",
            ScriptedPage::new(
                200,
                &[
                    "http://site/product/1",
                    "http://[bad",
                    "http://site/product/2",
                ],
            ),
        ),
        ("http://site/product/1", ScriptedPage::new(200, &[])),
        ("http://site/product/2", ScriptedPage::new(404, &[])),
    ]));

    let config = create_test_config(&["http://site/category/1"], 10, &dir);
    let mut crawler = coordinator(config, &site, TableProbe::default());
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.links_discovered, 3);
    assert_eq!(stats.invalid_links, 1);
    assert_eq!(stats.requests_dispatched, 3);
    assert_eq!(site.open_count("http://site/product/2"), 1);
    assert_eq!(stats.records_reported, 1);
}

#[tokio::test]
async fn test_stop_before_start_writes_empty_report() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(ScriptedSite::with_pages(vec![(
        "http://site/category/1",
        ScriptedPage::new(404, &[]),
    )]));

    let config = create_test_config(&["http://site/category/1"], 10, &dir);
    let mut crawler = coordinator(config, &site, TableProbe::default());
    crawler.cancellation_token().cancel();

    let stats = crawler.run().await.unwrap();

    assert!(stats.cancelled);
    assert_eq!(stats.requests_dispatched, 0);
    assert!(site.opened().is_empty());
    assert_eq!(crawler.phase(), CrawlPhase::Done);

    let records = load_report(&dir.path().join("results.json")).unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_stop_keeps_in_flight_records() {
    let dir = TempDir::new().unwrap();
    let token = CancellationToken::new();
    let site = Arc::new(ScriptedSite {
        pages: HashMap::from([
            (
                "http://site/category/1".to_string(),
                ScriptedPage::new(503, &["http://site/product/1"]),
            ),
            (
                "http://site/product/1".to_string(),
                ScriptedPage::new(404, &[]),
            ),
        ]),
        stop_on_open: Some(token.clone()),
        ..ScriptedSite::default()
    });

    let config = create_test_config(&["http://site/category/1"], 10, &dir);
    let mut crawler = coordinator(config, &site, TableProbe::default()).with_cancellation(token);

    let stats = crawler.run().await.unwrap();

    assert!(stats.cancelled);
    assert_eq!(stats.requests_dispatched, 1);

    let records = load_report(&dir.path().join("results.json")).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, "http://site/category/1");
    assert_eq!(records[0].status_code, 503);
}

#[tokio::test]
async fn test_concurrent_workers_keep_dedup() {
    let dir = TempDir::new().unwrap();

    // Every page links to every other page
    let urls: Vec<String> = (0..12).map(|i| format!("http://site/category/{}", i)).collect();
    let all: Vec<&str> = urls.iter().map(String::as_str).collect();
    let pages: Vec<(&str, ScriptedPage)> = all
        .iter()
        .enumerate()
        .map(|(i, url)| {
            let status = if i % 4 == 3 { 404 } else { 200 };
            (*url, ScriptedPage::new(status, &all))
        })
        .collect();
    let site = Arc::new(ScriptedSite::with_pages(pages));

    let mut config = create_test_config(&[all[0], all[5], all[9]], 100, &dir);
    config.crawler.max_concurrent_pages_open = 4;

    let mut crawler = coordinator(config, &site, TableProbe::default());
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.requests_dispatched, 12);
    for url in &all {
        assert_eq!(site.open_count(url), 1, "{} opened more than once", url);
    }
    assert_eq!(stats.records_reported, 3);
    assert_eq!(crawler.visited().len(), 12);
}

#[tokio::test]
async fn test_summary_is_written_when_configured() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(ScriptedSite::with_pages(vec![(
        "http://site/category/1",
        ScriptedPage::new(410, &[]),
    )]));

    let mut config = create_test_config(&["http://site/category/1"], 3, &dir);
    let summary_path = dir.path().join("out").join("summary.md");
    config.output.summary_path = Some(summary_path.display().to_string());

    let mut crawler = coordinator(config, &site, TableProbe::default()).with_config_hash("abc123");
    crawler.run().await.unwrap();

    let summary = std::fs::read_to_string(&summary_path).unwrap();
    assert!(summary.contains("http://site/category/1"));
    assert!(summary.contains("410"));
    assert!(summary.contains("abc123"));
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

#[tokio::test]
async fn test_full_crawl_over_http() {
    let dir = TempDir::new().unwrap();
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Second pagination state of the category
    Mock::given(method("GET"))
        .and(path("/category/1"))
        .and(query_param("page", "2"))
        .respond_with(html(r#"<a href="/product/3">Three</a>"#.to_string()))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/category/1"))
        .respond_with(html(format!(
            r#"<html><body>
            <a href="{}/product/1">One</a>
            <a href="/product/2#details">Two</a>
            <a href="/about">About</a>
            <div class="arrow right"><a href="?page=2">Next</a></div>
            </body></html>"#,
            base_url
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/product/1"))
        .respond_with(html("<p>fine</p>".to_string()))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/product/2"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/product/3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let seed = format!("{}/category/1", base_url);
    let config = create_test_config(&[seed.as_str()], 10, &dir);
    let mut crawler = Coordinator::new(config).expect("Failed to create coordinator");

    let stats = tokio::time::timeout(Duration::from_secs(30), crawler.run())
        .await
        .expect("Crawl timed out")
        .expect("Crawl failed");

    // The "next" anchor is a category link too and gets its own request
    assert_eq!(stats.requests_dispatched, 5);
    assert_eq!(stats.pagination_steps, 1);
    assert_eq!(stats.links_filtered, 1);

    let records = load_report(&dir.path().join("results.json")).unwrap();
    let found: Vec<(String, u16)> = records
        .iter()
        .map(|r| (r.url.clone(), r.status_code))
        .collect();
    assert_eq!(
        found,
        vec![
            (format!("{}/product/2", base_url), 404),
            (format!("{}/product/3", base_url), 500),
        ]
    );
}

#[tokio::test]
async fn test_links_followed_after_cross_host_redirect() {
    let dir = TempDir::new().unwrap();
    let mock_server = MockServer::start().await;
    let port = mock_server.address().port();
    let moved_to = format!("http://localhost:{}/category/1", port);

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", moved_to.as_str()))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/category/1"))
        .respond_with(html(r#"<a href="/product/1">One</a>"#.to_string()))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/product/1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let seed = format!("http://127.0.0.1:{}/old", port);
    let config = create_test_config(&[seed.as_str()], 10, &dir);
    let mut crawler = Coordinator::new(config).expect("Failed to create coordinator");
    let stats = crawler.run().await.expect("Crawl failed");

    assert_eq!(stats.requests_dispatched, 2);
    assert_eq!(stats.links_filtered, 0);

    let records = load_report(&dir.path().join("results.json")).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, format!("http://localhost:{}/product/1", port));
    assert_eq!(records[0].status_code, 404);
}

#[tokio::test]
async fn test_unreachable_seed_is_probed_once() {
    let dir = TempDir::new().unwrap();

    // Nothing listens on port 9 of localhost
    let config = create_test_config(&["http://127.0.0.1:9/category/1"], 5, &dir);
    let mut crawler = Coordinator::new(config).unwrap();
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.requests_dispatched, 1);
    assert_eq!(stats.fetch_errors, 1);
    assert_eq!(stats.records_reported, 0);
}
