//! Outbound fetching and the two scraping stages built on it.
//!
//! Every HTTP GET in the crate goes through the [`Fetch`] trait so the
//! pipeline can be driven by an in-memory fetcher in tests.
//!
//! # Submodules
//!
//! | Stage | Module | Input | Output |
//! |-------|--------|-------|--------|
//! | Feed Normalizer | [`feed`] | feed XML + source URL | `Vec<CanonicalItem>` |
//! | Content Extractor | [`article`] | article URL | [`article::ExtractedContent`] |
//!
//! Both stages recover their own failures: a broken source yields no items
//! and a broken article yields a sentinel, never an `Err` to the caller.

pub mod article;
pub mod feed;

use crate::error::FetchError;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Something that can GET a URL and return its body as text.
pub trait Fetch: Send + Sync {
    /// Fetch `url`, failing on transport errors, non-2xx statuses or after
    /// `timeout` when one is given.
    fn fetch_text(
        &self,
        url: &str,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// [`Fetch`] over a pooled `reqwest::Client` that presents itself as a desktop browser.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,application/rss+xml,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "debug", skip(self, timeout), fields(%url))]
    async fn fetch_text(&self, url: &str, timeout: Option<Duration>) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "Non-success HTTP status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp.text().await?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched"
        );
        Ok(body)
    }
}
