//! External news sources: connectivity, search and article extraction.
//!
//! The pipeline talks to the web through two traits so tests can swap in
//! fakes:
//!
//! | Trait | Live implementation | Used by stage |
//! |-------|---------------------|---------------|
//! | [`NewsSource`] | [`WebSources`] | `check_internet`, `search_news` |
//! | [`ContentFetch`] | [`extract::HttpExtractor`] | `scrape_articles` |
//!
//! Search goes through the DuckDuckGo HTML endpoint ([`duckduckgo`]) and
//! article text is pulled out with `scraper` ([`extract`]).

pub mod duckduckgo;
pub mod extract;

use crate::config::Settings;
use crate::error::Result;
use crate::models::ArticleStub;
use std::time::Duration;
use tracing::{info, instrument, warn};

pub use extract::HttpExtractor;

/// Network reachability and article discovery.
pub trait NewsSource {
    /// Probe the network; returns the probe's HTTP status code.
    async fn check_connectivity(&self) -> Result<u16>;

    /// Return up to `max_results` candidate articles for `query`.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ArticleStub>>;
}

/// Best-effort article text retrieval.
///
/// Implementations never fail: any retrieval or parsing problem yields an
/// empty string.
pub trait ContentFetch {
    async fn extract(&self, url: &str) -> String;
}

/// Build an HTTP client with the configured user agent and a fixed timeout.
pub(crate) fn build_client(settings: &Settings, timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(settings.user_agent.clone())
        .timeout(timeout)
        .build()?)
}

/// Live [`NewsSource`] backed by an HTTP probe and DuckDuckGo search.
#[derive(Debug, Clone)]
pub struct WebSources {
    probe: reqwest::Client,
    http: reqwest::Client,
    connectivity_url: String,
    region: String,
    time_limit: String,
}

impl WebSources {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            probe: build_client(settings, settings.connectivity_timeout())?,
            http: build_client(settings, settings.fetch_timeout())?,
            connectivity_url: settings.connectivity_url.clone(),
            region: settings.search_region.clone(),
            time_limit: settings.search_time_limit.clone(),
        })
    }
}

impl NewsSource for WebSources {
    #[instrument(level = "info", skip_all, fields(url = %self.connectivity_url))]
    async fn check_connectivity(&self) -> Result<u16> {
        match self.probe.get(&self.connectivity_url).send().await {
            Ok(response) => {
                let code = response.status().as_u16();
                info!(status = code, "Connectivity probe answered");
                Ok(code)
            }
            Err(e) => {
                warn!(error = %e, "Connectivity probe failed");
                Err(e.into())
            }
        }
    }

    #[instrument(level = "info", skip(self))]
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ArticleStub>> {
        duckduckgo::search(&self.http, query, &self.region, &self.time_limit, max_results).await
    }
}
