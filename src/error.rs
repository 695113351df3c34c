//! Error taxonomy for the digest pipeline.
//!
//! Only [`PipelineError`] and [`ConfigError`] ever reach a caller outside the
//! pipeline. Fetch, feed and summarizer errors are recovered at the component
//! that owns them and turned into sentinels or fallback text.

use thiserror::Error;

/// An outbound HTTP GET failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },
}

/// A single source could not be turned into items.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("malformed feed: {0}")]
    Parse(String),
}

/// Internal scoring failure; always recovered by the summarizer fallback.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SummarizeError {
    #[error("invalid word bounds: min {min} > max {max}")]
    InvalidBounds { min: usize, max: usize },
    #[error("no scorable sentences")]
    NoSentences,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Failures visible to the HTTP layer and the CLI.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no item with guid {0}")]
    NotFound(String),
}
