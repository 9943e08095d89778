pub mod health;
pub mod upload_queue;

use axum::Router;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /upload-queue                         submit spreadsheet (POST)
/// /upload-queue/recent                  newest jobs (GET)
/// /upload-queue/status                  batch status (GET, ?ids=a,b)
/// /upload-queue/status/{job_id}         single status (GET)
/// /upload-queue/cancel/{job_id}         cancel (DELETE)
/// ```
pub fn api_routes(config: &ServerConfig) -> Router<AppState> {
    Router::new().nest(
        "/upload-queue",
        upload_queue::router(config.max_upload_bytes),
    )
}
