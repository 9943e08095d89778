//! Handlers for the `/upload-queue` resource.
//!
//! The proxy validates input, turns the uploaded spreadsheet into transaction
//! rows, and otherwise relays to the processing backend, which owns all job
//! state.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use futures::future::join_all;
use loyalty_backend::QueueJobRequest;
use loyalty_core::error::CoreError;
use loyalty_core::spreadsheet::read_first_sheet;
use loyalty_core::transactions::map_rows;
use loyalty_core::upload_job::{parse_id_list, select_recent, DEFAULT_RECENT_LIMIT};
use serde::Deserialize;

use crate::config::CancelMode;
use crate::error::{AppError, AppResult};
use crate::extract::{ApiMultipart, ApiPath, ApiQuery};
use crate::response::{AckResponse, SubmitResponse};
use crate::state::AppState;

/// Multipart field carrying the spreadsheet.
const FILE_FIELD: &str = "file";

/// Multipart field carrying the target branch.
const BRANCH_FIELD: &str = "branchId";

/// Name used when the file part carries no file name.
const FALLBACK_FILE_NAME: &str = "upload.xlsx";

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/upload-queue
///
/// Accept a multipart `file` + `branchId`, extract the first sheet's rows and
/// queue them on the processing backend. Missing input is rejected before
/// the backend is contacted.
pub async fn submit_upload(
    State(state): State<AppState>,
    ApiMultipart(mut multipart): ApiMultipart,
) -> AppResult<Json<SubmitResponse>> {
    let mut file: Option<(String, Bytes)> = None;
    let mut branch_id: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                let file_name = field
                    .file_name()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or(FALLBACK_FILE_NAME)
                    .to_string();
                let data = field.bytes().await?;
                file = Some((file_name, data));
            }
            Some(BRANCH_FIELD) => {
                branch_id = Some(field.text().await?);
            }
            _ => {}
        }
    }

    let branch_id = branch_id
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
        .ok_or_else(|| CoreError::Validation("branchId is required".to_string()))?;
    let (file_name, data) = file
        .filter(|(_, data)| !data.is_empty())
        .ok_or_else(|| CoreError::Validation("file is required".to_string()))?;

    let transactions = {
        let file_name = file_name.clone();
        tokio::task::spawn_blocking(move || {
            let today = chrono::Utc::now().date_naive();
            read_first_sheet(&file_name, &data).map(|rows| map_rows(&rows, today))
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Spreadsheet parsing task failed");
            AppError::InternalError("Upload failed".to_string())
        })??
    };

    let rows = transactions.len();
    let request = QueueJobRequest {
        branch_id: branch_id.clone(),
        file_name: file_name.clone(),
        transactions,
    };

    let created = state
        .backend
        .submit_job(&request)
        .await
        .map_err(|e| e.into_core("Backend upload failed"))?;

    tracing::info!(
        job_id = %created.job_id,
        branch_id = %branch_id,
        file_name = %file_name,
        rows,
        "Upload queued",
    );

    Ok(Json(SubmitResponse {
        success: true,
        message: created
            .message
            .unwrap_or_else(|| format!("Queued {rows} transactions for processing")),
        job_id: created.job_id,
    }))
}

// ---------------------------------------------------------------------------
// Recent
// ---------------------------------------------------------------------------

/// Query parameters for the recent-jobs listing.
#[derive(Debug, Deserialize)]
pub struct RecentParams {
    pub limit: Option<usize>,
}

/// GET /api/upload-queue/recent?limit=N
///
/// Newest-first job list truncated to `limit` (default 10).
pub async fn recent_jobs(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<RecentParams>,
) -> AppResult<Json<Vec<serde_json::Value>>> {
    let limit = params.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    if limit == 0 {
        return Ok(Json(Vec::new()));
    }

    let jobs = state
        .backend
        .list_jobs(limit)
        .await
        .map_err(|e| e.into_core("Failed to fetch recent jobs"))?;

    Ok(Json(select_recent(jobs, limit)))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Query parameters for the batch status read.
#[derive(Debug, Deserialize)]
pub struct BatchStatusParams {
    pub ids: Option<String>,
}

/// GET /api/upload-queue/status?ids=a,b,c
///
/// Looks every id up concurrently. Lookups that fail are dropped from the
/// result, so the array may be shorter than the id list and its order is
/// not significant.
pub async fn batch_status(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<BatchStatusParams>,
) -> AppResult<Json<Vec<serde_json::Value>>> {
    let raw = params
        .ids
        .ok_or_else(|| CoreError::Validation("ids query parameter is required".to_string()))?;
    let ids = parse_id_list(&raw);

    let lookups = ids.iter().map(|id| {
        let backend = state.backend.clone();
        async move { (id, backend.job_status(id).await) }
    });

    let statuses: Vec<serde_json::Value> = join_all(lookups)
        .await
        .into_iter()
        .filter_map(|(id, result)| match result {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::warn!(job_id = %id, error = %e, "Dropping failed status lookup");
                None
            }
        })
        .collect();

    tracing::debug!(requested = ids.len(), returned = statuses.len(), "Batch status read");

    Ok(Json(statuses))
}

/// GET /api/upload-queue/status/{job_id}
///
/// Relays the backend's status JSON unchanged; unknown jobs are 404.
pub async fn job_status(
    State(state): State<AppState>,
    ApiPath(job_id): ApiPath<String>,
) -> AppResult<Json<serde_json::Value>> {
    let job_id = require_job_id(&job_id)?;

    let status = state
        .backend
        .job_status(job_id)
        .await
        .map_err(|e| e.into_core("Failed to fetch job status"))?;

    Ok(Json(status))
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

/// DELETE /api/upload-queue/cancel/{job_id}
///
/// In [`CancelMode::Acknowledge`] the request is accepted locally; in
/// [`CancelMode::Forward`] the backend decides and its errors propagate.
pub async fn cancel_job(
    State(state): State<AppState>,
    ApiPath(job_id): ApiPath<String>,
) -> AppResult<Json<AckResponse>> {
    let job_id = require_job_id(&job_id)?;

    match state.config.cancel_mode {
        CancelMode::Acknowledge => {
            tracing::info!(job_id, "Cancellation acknowledged without backend contact");
        }
        CancelMode::Forward => {
            state
                .backend
                .cancel_job(job_id)
                .await
                .map_err(|e| e.into_core("Failed to cancel job"))?;
            tracing::info!(job_id, "Cancellation forwarded to backend");
        }
    }

    Ok(Json(AckResponse::new(format!(
        "Cancellation requested for job {job_id}"
    ))))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn require_job_id(raw: &str) -> Result<&str, CoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("jobId is required".to_string()));
    }
    Ok(trimmed)
}
