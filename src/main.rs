//! # News Digest
//!
//! Aggregates syndicated news feeds, resolves each entry's full article text
//! and produces a bounded-length extractive summary for every entry.
//!
//! ## Usage
//!
//! ```sh
//! news_digest serve --port 3001
//! news_digest digest -j ./json
//! news_digest item "https://www.example.com/story"
//! ```
//!
//! ## Architecture
//!
//! The application is a request-scoped pipeline:
//! 1. **Normalizing**: fetch every RSS/Atom source concurrently into canonical items
//! 2. **Sorting**: merge all sources, newest first
//! 3. **Extracting**: fetch each article and pull its main text (batches of 3, 2s apart)
//! 4. **Summarizing**: reduce article text, or the feed teaser, to 55-60 words
//!
//! Results are served over HTTP or written as JSON; nothing is persisted.

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod summarize;
mod utils;

use cli::{Cli, Command};
use outputs::json;
use pipeline::Pipeline;
use scrapers::HttpFetcher;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let start_time = std::time::Instant::now();
    info!("news_digest starting up");

    let args = Cli::parse();
    debug!(?args.command, ?args.config, "Parsed CLI arguments");

    let config = Arc::new(args.pipeline_config()?);
    info!(
        sources = config.sources.len(),
        batch_size = config.batch_size,
        batch_delay_ms = config.batch_delay_ms,
        min_words = config.min_words,
        max_words = config.max_words,
        "Pipeline configured"
    );

    let fetcher = HttpFetcher::new(&config.user_agent)?;
    let pipeline = Arc::new(Pipeline::new(Arc::clone(&config), fetcher));

    match args.command {
        Command::Serve { port } => {
            api::serve(pipeline, port).await?;
        }
        Command::Digest { json_output_dir } => {
            // Fail before any network work if the output is unusable.
            if let Some(dir) = &json_output_dir {
                ensure_writable_dir(dir).await?;
            }
            let digest = pipeline.process_all().await;
            match json_output_dir {
                Some(dir) => {
                    let path = json::write_digest(&digest, &dir).await?;
                    info!(path = %path.display(), "Digest written");
                }
                None => println!("{}", serde_json::to_string_pretty(&digest)?),
            }
        }
        Command::Item { guid } => {
            let item = pipeline.process_one(&guid).await?;
            println!("{}", serde_json::to_string_pretty(&item)?);
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}
