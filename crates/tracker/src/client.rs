//! HTTP client for the `/api/upload-queue` endpoints.

use std::path::Path;

use async_trait::async_trait;
use loyalty_core::types::JobId;
use loyalty_core::upload_job::UploadJob;
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::Deserialize;

use crate::error::TrackerError;
use crate::poller::StatusSource;

/// Body of a successful submission.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submitted {
    pub success: bool,
    pub job_id: JobId,
    pub message: String,
}

/// Body of an acknowledged cancellation.
#[derive(Debug, Clone, Deserialize)]
pub struct Acknowledged {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    code: Option<String>,
}

/// Client for one upload-queue API deployment.
#[derive(Debug, Clone)]
pub struct QueueClient {
    client: reqwest::Client,
    base_url: Url,
}

impl QueueClient {
    /// `base_url` is the API origin, e.g. `http://localhost:3000`.
    pub fn new(base_url: &str) -> Result<Self, TrackerError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, TrackerError> {
        let base_url =
            Url::parse(base_url).map_err(|e| TrackerError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(TrackerError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, TrackerError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| TrackerError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "upload-queue"])
            .extend(segments);
        Ok(url)
    }

    /// Upload the spreadsheet at `path` for `branch_id`.
    pub async fn submit_file(&self, path: &Path, branch_id: &str) -> Result<Submitted, TrackerError> {
        let data = tokio::fs::read(path).await.map_err(|source| TrackerError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.xlsx".to_string());
        self.submit_bytes(file_name, data, branch_id).await
    }

    /// Upload an in-memory spreadsheet.
    pub async fn submit_bytes(
        &self,
        file_name: String,
        data: Vec<u8>,
        branch_id: &str,
    ) -> Result<Submitted, TrackerError> {
        let form = Form::new()
            .text("branchId", branch_id.to_string())
            .part("file", Part::bytes(data).file_name(file_name));

        let response = self
            .client
            .post(self.endpoint(&[])?)
            .multipart(form)
            .send()
            .await?;
        parse_response(response).await
    }

    /// Statuses for `ids`; ids the API could not resolve are absent.
    ///
    /// Entries that do not decode as a job (unknown status, missing id) are
    /// dropped one by one, so a single odd entry never hides the others.
    pub async fn batch_status(&self, ids: &[JobId]) -> Result<Vec<UploadJob>, TrackerError> {
        let response = self
            .client
            .get(self.endpoint(&["status"])?)
            .query(&[("ids", ids.join(","))])
            .send()
            .await?;
        let entries: Vec<serde_json::Value> = parse_response(response).await?;
        Ok(decode_jobs(entries))
    }

    pub async fn job_status(&self, id: &str) -> Result<UploadJob, TrackerError> {
        let response = self
            .client
            .get(self.endpoint(&["status", id])?)
            .send()
            .await?;
        parse_response(response).await
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<UploadJob>, TrackerError> {
        let response = self
            .client
            .get(self.endpoint(&["recent"])?)
            .query(&[("limit", limit)])
            .send()
            .await?;
        parse_response(response).await
    }

    pub async fn cancel(&self, id: &str) -> Result<Acknowledged, TrackerError> {
        let response = self
            .client
            .delete(self.endpoint(&["cancel", id])?)
            .send()
            .await?;
        parse_response(response).await
    }
}

#[async_trait]
impl StatusSource for QueueClient {
    async fn fetch_statuses(&self, ids: &[JobId]) -> Result<Vec<UploadJob>, TrackerError> {
        self.batch_status(ids).await
    }

    async fn request_cancel(&self, id: &str) -> Result<(), TrackerError> {
        self.cancel(id).await.map(|_| ())
    }
}

fn decode_jobs(entries: Vec<serde_json::Value>) -> Vec<UploadJob> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<UploadJob>(entry.clone()) {
            Ok(job) => Some(job),
            Err(e) => {
                let id = entry
                    .get("id")
                    .or_else(|| entry.get("job_id"))
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                tracing::warn!(job_id = %id, error = %e, "Skipping undecodable job status");
                None
            }
        })
        .collect()
}

/// Decode a success body, or turn the API's error body into
/// [`TrackerError::Api`].
async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, TrackerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<ErrorBody>(&text).ok();
    let (message, code) = match body {
        Some(ErrorBody { error, code }) => (error, code),
        None => (None, None),
    };
    Err(TrackerError::Api {
        status: status.as_u16(),
        code,
        message: message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string()),
    })
}
