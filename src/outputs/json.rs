//! JSON output of a digest run.
//!
//! Each run lands in `{json_output_dir}/{YYYY-MM-DD}/{edition}.json`, where
//! the edition is the local time of day. A later run in the same edition
//! replaces the earlier file.

use crate::models::FeedsResponse;
use crate::utils::time_of_day;
use chrono::Local;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `digest` as pretty JSON and return the file path.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_digest(
    digest: &FeedsResponse,
    json_output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let local_date = Local::now().date_naive().to_string();
    write_digest_as(digest, json_output_dir, &local_date, &time_of_day()).await
}

async fn write_digest_as(
    digest: &FeedsResponse,
    json_output_dir: &str,
    local_date: &str,
    edition: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(digest)?;

    let full_json_dir = PathBuf::from(json_output_dir).join(local_date);
    info!(dir = %full_json_dir.display(), "Ensuring JSON directory exists");
    if let Err(e) = fs::create_dir_all(&full_json_dir).await {
        error!(dir = %full_json_dir.display(), error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = full_json_dir.join(format!("{edition}.json"));
    fs::write(&path, json).await?;
    info!(path = %path.display(), items = digest.items.len(), "Wrote digest JSON");
    Ok(path)
}
