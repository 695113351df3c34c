//! HTTP service exposing the pipeline.
//!
//! | Route | Pipeline call | Success | Failure |
//! |-------|---------------|---------|---------|
//! | `GET /feeds/all` | [`Pipeline::process_all`] | `FeedsResponse` | none |
//! | `GET /feeds/item/{guid}` | [`Pipeline::process_one`] | `ProcessedItem` | 404 + error payload |
//! | `GET /health` | none | `OK` | none |
//!
//! Every request recomputes from scratch; the router only shares the
//! immutable pipeline.

use crate::error::PipelineError;
use crate::models::FeedsResponse;
use crate::pipeline::Pipeline;
use crate::scrapers::Fetch;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::error::Error;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, instrument, warn};

/// Build the router around a shared pipeline.
pub fn router<F>(pipeline: Arc<Pipeline<F>>) -> Router
where
    F: Fetch + 'static,
{
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/feeds/all", get(all_feeds::<F>))
        .route("/feeds/item/{guid}", get(feed_item::<F>))
        .layer(CorsLayer::very_permissive())
        .with_state(pipeline)
}

#[instrument(level = "info", skip_all)]
async fn all_feeds<F: Fetch + 'static>(
    State(pipeline): State<Arc<Pipeline<F>>>,
) -> Json<FeedsResponse> {
    let response = pipeline.process_all().await;
    info!(items = response.items.len(), "Served /feeds/all");
    Json(response)
}

#[instrument(level = "info", skip_all, fields(%guid))]
async fn feed_item<F: Fetch + 'static>(
    State(pipeline): State<Arc<Pipeline<F>>>,
    Path(guid): Path<String>,
) -> Response {
    match pipeline.process_one(&guid).await {
        Ok(item) => Json(item).into_response(),
        Err(PipelineError::NotFound(guid)) => {
            warn!(%guid, "Item not found");
            (StatusCode::NOT_FOUND, Json(json!({ "error": "Item not found" }))).into_response()
        }
    }
}

/// Bind `0.0.0.0:{port}` and serve until the process is stopped.
pub async fn serve<F>(pipeline: Arc<Pipeline<F>>, port: u16) -> Result<(), Box<dyn Error>>
where
    F: Fetch + 'static,
{
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, sources = pipeline.config().sources.len(), "HTTP server listening");
    axum::serve(listener, router(pipeline)).await?;
    Ok(())
}
