//! Page fetch adapter
//!
//! This module defines the seams to the page renderer and the raw status
//! probe, and ships HTTP implementations of both:
//! - `PageFetcher` opens a URL and hands back a `RenderedPage`
//! - `RenderedPage` exposes the final status, link extraction and the
//!   pagination primitives of one open page
//! - `StatusProbe` performs a plain GET and returns the status code
//!
//! `HttpPageFetcher` renders statically: the DOM is the served HTML and
//! activating the pagination control navigates to the link it carries.

use crate::config::{BrowserConfig, BrowserEngine};
use crate::crawler::classify::is_report_worthy;
use crate::crawler::parser::{extract_links, find_next_page, Links};
use crate::url::NormalizedUrl;
use crate::{FetchError, SweepError};
use async_trait::async_trait;
use reqwest::Client;
use scraper::Selector;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// One open page (tab) owned by a single in-flight request
///
/// The owner must call [`RenderedPage::close`] when done, on success and on
/// error alike.
#[async_trait]
pub trait RenderedPage: Send {
    /// URL of the current page state
    fn url(&self) -> &Url;

    /// Final HTTP status of the navigation that opened the page
    fn status_code(&self) -> u16;

    /// Links of the current page state, resolved against [`RenderedPage::url`]
    fn extract_links(&self) -> Links;

    /// Whether the current state shows a "next page" control
    async fn has_next_page(&mut self) -> Result<bool, FetchError>;

    /// Activates the "next page" control and waits for the new state
    ///
    /// Callers bound the wait; implementations need not.
    async fn go_to_next_page(&mut self) -> Result<(), FetchError>;

    /// Releases the page
    async fn close(self: Box<Self>);
}

/// Opens pages
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn open(&self, url: &Url) -> Result<Box<dyn RenderedPage>, FetchError>;

    /// Releases renderer-wide resources at the end of a run
    async fn shutdown(&self) {}
}

/// Plain GET used to double-check a status outside the renderer
#[async_trait]
pub trait StatusProbe: Send + Sync {
    async fn raw_get(&self, url: &Url) -> Result<u16, FetchError>;
}

/// Result of dispatching one request to the renderer
///
/// Exactly one of `page` and `fetch_error` is set.
pub struct FetchResult {
    pub url: NormalizedUrl,
    pub status_code: Option<u16>,
    pub page: Option<Box<dyn RenderedPage>>,
    pub fetch_error: Option<FetchError>,
}

impl std::fmt::Debug for FetchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchResult")
            .field("url", &self.url.as_str())
            .field("status_code", &self.status_code)
            .field("page_open", &self.page.is_some())
            .field("fetch_error", &self.fetch_error)
            .finish()
    }
}

/// Opens `url` with the renderer, bounded by `timeout`
///
/// A navigation that does not finish in time yields `FetchError::Timeout`.
pub async fn fetch(fetcher: &dyn PageFetcher, url: &NormalizedUrl, timeout: Duration) -> FetchResult {
    let outcome = match tokio::time::timeout(timeout, fetcher.open(url.as_url())).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            url: url.to_string(),
        }),
    };

    match outcome {
        Ok(page) => FetchResult {
            url: url.clone(),
            status_code: Some(page.status_code()),
            page: Some(page),
            fetch_error: None,
        },
        Err(error) => FetchResult {
            url: url.clone(),
            status_code: None,
            page: None,
            fetch_error: Some(error),
        },
    }
}

/// Builds the HTTP client shared by the renderer and the probe
///
/// # Example
///
/// ```no_run
/// use sumi_sweep::config::BrowserEngine;
/// use sumi_sweep::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(BrowserEngine::Chromium, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(engine: BrowserEngine, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_for(engine))
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Browser-like user agent for each engine
fn user_agent_for(engine: BrowserEngine) -> &'static str {
    match engine {
        BrowserEngine::Chromium => {
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 SumiSweep/1.0"
        }
        BrowserEngine::Firefox => {
            "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0 SumiSweep/1.0"
        }
        BrowserEngine::Webkit => {
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_2) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15 SumiSweep/1.0"
        }
    }
}

fn map_reqwest_error(url: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Network {
            url: url.to_string(),
            message: "Connection refused".to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Static HTML renderer on top of reqwest
#[derive(Clone)]
pub struct HttpPageFetcher {
    client: Client,
    pagination_selector: Arc<Selector>,
}

impl HttpPageFetcher {
    /// Prepares the renderer for a run
    ///
    /// # Returns
    ///
    /// * `Ok(HttpPageFetcher)` - Renderer ready
    /// * `Err(SweepError::BrowserLaunch)` - Client or selector could not be built
    pub fn launch(config: &BrowserConfig, navigation_timeout: Duration) -> Result<Self, SweepError> {
        let launch_error = |message: String| SweepError::BrowserLaunch {
            engine: config.engine.to_string(),
            message,
        };

        let selector = Selector::parse(&config.pagination_selector)
            .map_err(|e| launch_error(format!("invalid pagination selector: {:?}", e)))?;

        let client = build_http_client(config.engine, navigation_timeout)
            .map_err(|e| launch_error(e.to_string()))?;

        tracing::info!(
            "Renderer ready (engine: {}, headless: {})",
            config.engine,
            config.headless
        );
        if !config.headless {
            tracing::debug!("Static renderer has no window; headless = false has no effect");
        }

        Ok(Self {
            client,
            pagination_selector: Arc::new(selector),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn load(&self, url: &Url) -> Result<(Url, u16, String), FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        let final_url = response.url().clone();
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        Ok((final_url, status, body))
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn open(&self, url: &Url) -> Result<Box<dyn RenderedPage>, FetchError> {
        let (final_url, status, body) = self.load(url).await?;

        if final_url != *url {
            tracing::debug!("{} redirected to {}", url, final_url);
        }

        Ok(Box::new(HttpPage {
            fetcher: self.clone(),
            url: final_url,
            status,
            body,
        }))
    }
}

/// A page rendered by [`HttpPageFetcher`]
struct HttpPage {
    fetcher: HttpPageFetcher,
    url: Url,
    status: u16,
    body: String,
}

#[async_trait]
impl RenderedPage for HttpPage {
    fn url(&self) -> &Url {
        &self.url
    }

    fn status_code(&self) -> u16 {
        self.status
    }

    fn extract_links(&self) -> Links {
        extract_links(&self.body, &self.url)
    }

    async fn has_next_page(&mut self) -> Result<bool, FetchError> {
        Ok(find_next_page(&self.body, &self.url, &self.fetcher.pagination_selector).is_some())
    }

    async fn go_to_next_page(&mut self) -> Result<(), FetchError> {
        let control = find_next_page(&self.body, &self.url, &self.fetcher.pagination_selector);
        let target = control
            .and_then(|c| c.target)
            .ok_or_else(|| FetchError::Navigation {
                url: self.url.to_string(),
                message: "pagination control has no link target".to_string(),
            })?;

        let (final_url, status, body) = self.fetcher.load(&target).await?;

        if is_report_worthy(status) {
            return Err(FetchError::Navigation {
                url: target.to_string(),
                message: format!("next page answered with status {}", status),
            });
        }

        self.url = final_url;
        self.body = body;
        Ok(())
    }

    async fn close(self: Box<Self>) {
        tracing::trace!("Closing page {}", self.url);
    }
}

/// Raw status probe on top of reqwest
#[derive(Clone)]
pub struct HttpStatusProbe {
    client: Client,
}

impl HttpStatusProbe {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusProbe for HttpStatusProbe {
    async fn raw_get(&self, url: &Url) -> Result<u16, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;
        Ok(response.status().as_u16())
    }
}
