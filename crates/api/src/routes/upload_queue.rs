//! Route definitions for the `/upload-queue` resource.

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::upload_queue;
use crate::state::AppState;

/// Routes mounted at `/upload-queue`.
///
/// ```text
/// POST   /                    -> submit_upload (multipart, body limit applies)
/// GET    /recent              -> recent_jobs
/// GET    /status              -> batch_status
/// GET    /status/{job_id}     -> job_status
/// DELETE /cancel/{job_id}     -> cancel_job
/// ```
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(upload_queue::submit_upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/recent", get(upload_queue::recent_jobs))
        .route("/status", get(upload_queue::batch_status))
        .route("/status/{job_id}", get(upload_queue::job_status))
        .route("/cancel/{job_id}", delete(upload_queue::cancel_job))
}
