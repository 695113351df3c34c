//! Command-line interface definitions for News Digest.
//!
//! Global options pick the configuration file and override individual
//! tunables; the subcommand picks what to run. All options can also come
//! from environment variables where noted.

use crate::config::PipelineConfig;
use crate::error::ConfigError;
use clap::{Parser, Subcommand};

/// Command-line arguments for the News Digest application.
///
/// ```sh
/// # Serve the HTTP API with the built-in source list
/// news_digest serve --port 3001
///
/// # One-shot digest written under ./json/<date>/<edition>.json
/// news_digest --config feeds.yaml digest -j ./json
///
/// # Summarize a single item by guid
/// news_digest item "https://www.example.com/story"
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a YAML pipeline configuration file
    #[arg(short, long, env = "NEWS_DIGEST_CONFIG", global = true)]
    pub config: Option<String>,

    /// Items processed concurrently per batch
    #[arg(long, global = true)]
    pub batch_size: Option<usize>,

    /// Pause between batches, in milliseconds
    #[arg(long, global = true)]
    pub batch_delay_ms: Option<u64>,

    /// Article fetch timeout, in milliseconds
    #[arg(long, global = true)]
    pub fetch_timeout_ms: Option<u64>,

    /// Lower summary length target, in words
    #[arg(long, global = true)]
    pub min_words: Option<usize>,

    /// Upper summary length target, in words
    #[arg(long, global = true)]
    pub max_words: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Serve the HTTP API
    Serve {
        #[arg(short, long, env = "PORT", default_value_t = 3001)]
        port: u16,
    },
    /// Process every source once and print or write the result as JSON
    Digest {
        /// Output directory for the JSON file; prints to stdout when omitted
        #[arg(short, long)]
        json_output_dir: Option<String>,
    },
    /// Process the single item carrying this guid
    Item { guid: String },
}

impl Cli {
    /// Resolve the configuration file, apply flag overrides and validate.
    pub fn pipeline_config(&self) -> Result<PipelineConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_yaml_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(n) = self.batch_size {
            config.batch_size = n;
        }
        if let Some(ms) = self.batch_delay_ms {
            config.batch_delay_ms = ms;
        }
        if let Some(ms) = self.fetch_timeout_ms {
            config.fetch_timeout_ms = ms;
        }
        if let Some(n) = self.min_words {
            config.min_words = n;
        }
        if let Some(n) = self.max_words {
            config.max_words = n;
        }
        config.validate()?;
        Ok(config)
    }
}
