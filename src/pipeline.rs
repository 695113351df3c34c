//! Batch Pipeline: sources → items → article text → summaries.
//!
//! ```text
//! sources ──join_all──► merge ──► sort by pubDate desc ──► batches of N
//!                                                            │
//!               ┌────────────── join_all per batch ◄─────────┘
//!               ▼
//!     link? ── yes ──► fetch + extract ──► usable? ── yes ──► summarize(article)
//!       │                                     │
//!       no                                    no
//!       └──────────────► summarize(description) ◄┘
//! ```
//!
//! Batches run strictly one after another with a fixed pause in between.
//! Within a batch every item runs concurrently, and results are collected
//! in input order regardless of which finishes first. Nothing in per-item
//! processing can fail: the worst case is a summary of the feed teaser.
//! Nothing in [`Pipeline::process_all`] can fail either: a source that is
//! down contributes no items, and no sources at all is an empty digest.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::models::{CanonicalItem, FeedsResponse, ProcessedItem};
use crate::scrapers::Fetch;
use crate::scrapers::article;
use crate::scrapers::feed;
use crate::summarize::summarize;
use crate::utils::{html_to_text, truncate_for_log};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use futures::future::join_all;
use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Parse the date formats feeds actually use. `None` for anything else.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .or_else(|| {
            ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .or_else(|| {
                    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                })
                .map(|naive| naive.and_utc().fixed_offset())
        })
}

/// Newest first. Items whose date does not parse keep their position;
/// dated items are stably sorted into the remaining slots.
pub fn sort_by_date_desc(items: &mut [CanonicalItem]) {
    let mut dated: Vec<(usize, DateTime<FixedOffset>)> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| parse_pub_date(&item.pub_date).map(|d| (i, d)))
        .collect();
    let slots: Vec<usize> = dated.iter().map(|(i, _)| *i).collect();
    dated.sort_by_key(|(_, date)| Reverse(*date));

    let reordered: Vec<CanonicalItem> = dated.iter().map(|(i, _)| items[*i].clone()).collect();
    for (slot, item) in slots.into_iter().zip(reordered) {
        items[slot] = item;
    }
}

/// Orchestrates normalization, extraction and summarization for one request.
///
/// Holds no mutable state; one instance can serve any number of concurrent
/// requests.
#[derive(Debug)]
pub struct Pipeline<F> {
    config: Arc<PipelineConfig>,
    fetcher: F,
}

impl<F: Fetch> Pipeline<F> {
    pub fn new(config: Arc<PipelineConfig>, fetcher: F) -> Self {
        Self { config, fetcher }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Normalize every source concurrently, merged in source order.
    async fn load_all(&self) -> Vec<CanonicalItem> {
        join_all(
            self.config
                .sources
                .iter()
                .map(|url| feed::load_source(&self.fetcher, url)),
        )
        .await
        .into_iter()
        .flatten()
        .collect()
    }

    /// Every item from every source, newest first, each with a summary.
    ///
    /// Sources are fetched concurrently and merged in source order, then
    /// sorted newest first. Items are processed in batches of
    /// `config.batch_size` with `config.batch_delay_ms` between batches.
    ///
    /// # Returns
    ///
    /// A [`FeedsResponse`] echoing the configured sources, stamped with the
    /// current UTC time (millisecond precision, `Z` suffix). Sources that
    /// fail contribute no items; with no sources the item list is empty.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let pipeline = Pipeline::new(Arc::new(PipelineConfig::default()), fetcher);
    /// let digest = pipeline.process_all().await;
    /// println!("{} items", digest.items.len());
    /// ```
    #[instrument(level = "info", skip_all)]
    pub async fn process_all(&self) -> FeedsResponse {
        let t0 = Instant::now();

        let mut items = self.load_all().await;
        sort_by_date_desc(&mut items);
        info!(
            sources = self.config.sources.len(),
            count = items.len(),
            "Merged feed items"
        );

        let processed = self.process_batches(&items).await;
        info!(
            count = processed.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Processed all feeds"
        );

        FeedsResponse {
            sources: self.config.sources.clone(),
            last_updated: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            items: processed,
        }
    }

    /// Process `items` in fixed-size concurrent batches, pausing between batches.
    pub async fn process_batches(&self, items: &[CanonicalItem]) -> Vec<ProcessedItem> {
        let batch_size = self.config.batch_size.max(1);
        let total_batches = items.len().div_ceil(batch_size);
        let mut out = Vec::with_capacity(items.len());

        for (batch, chunk) in items.chunks(batch_size).enumerate() {
            if batch > 0 {
                sleep(self.config.batch_delay()).await;
            }
            debug!(batch = batch + 1, total_batches, size = chunk.len(), "Processing batch");
            out.extend(join_all(chunk.iter().map(|item| self.process_item(item))).await);
        }
        out
    }

    /// Summarize one item from its article, or from its feed description.
    #[instrument(level = "debug", skip_all, fields(guid = %item.guid))]
    pub async fn process_item(&self, item: &CanonicalItem) -> ProcessedItem {
        let summary = if item.has_link() {
            let timeout = self.config.fetch_timeout();
            let extracted = article::fetch_content(&self.fetcher, &item.link, timeout).await;
            match extracted.usable_text() {
                Some(text) => summarize(text, self.config.min_words, self.config.max_words),
                None => {
                    warn!(
                        guid = %item.guid,
                        outcome = %truncate_for_log(&extracted.to_string(), 160),
                        "Summarizing feed description instead of article"
                    );
                    self.summarize_description(item)
                }
            }
        } else {
            debug!(guid = %item.guid, "No link; summarizing feed description");
            self.summarize_description(item)
        };
        ProcessedItem::from_item(item, summary)
    }

    fn summarize_description(&self, item: &CanonicalItem) -> String {
        summarize(
            &html_to_text(&item.description),
            self.config.min_words,
            self.config.max_words,
        )
    }

    /// Find the item carrying `guid` across all sources and process it alone.
    ///
    /// Every source is normalized again; there is no batching or pause since
    /// only one item is processed.
    ///
    /// # Arguments
    ///
    /// * `guid` - The item identifier, compared for exact equality
    ///
    /// # Returns
    ///
    /// The [`ProcessedItem`] for the first matching item, or
    /// [`PipelineError::NotFound`] when no source carries `guid`.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// match pipeline.process_one("https://www.example.com/story").await {
    ///     Ok(item) => println!("{}", item.summarized_content),
    ///     Err(PipelineError::NotFound(guid)) => eprintln!("no such item: {guid}"),
    /// }
    /// ```
    #[instrument(level = "info", skip(self))]
    pub async fn process_one(&self, guid: &str) -> Result<ProcessedItem, PipelineError> {
        let items = self.load_all().await;
        let item = items
            .iter()
            .find(|item| item.guid == guid)
            .ok_or_else(|| PipelineError::NotFound(guid.to_string()))?;
        Ok(self.process_item(item).await)
    }
}
