//! REST client for the processing backend's upload endpoints.
//!
//! ```text
//! POST /api/uploads/queue              create a job
//! GET  /api/uploads/jobs?limit=N       list jobs
//! GET  /api/uploads/status/{job_id}    single job status
//! POST /api/uploads/cancel/{job_id}    cancel a job
//! ```

use std::time::Duration;

use async_trait::async_trait;
use loyalty_core::transactions::TransactionRow;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{extract_message, BackendError};

/// Job-creation payload sent to `POST /api/uploads/queue`.
#[derive(Debug, Clone, Serialize)]
pub struct QueueJobRequest {
    pub branch_id: String,
    pub file_name: String,
    pub transactions: Vec<TransactionRow>,
}

/// Response of `POST /api/uploads/queue`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueJobResponse {
    /// Backend-assigned job identifier.
    pub job_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Operations the upload-queue proxy needs from the processing backend.
///
/// Status payloads are returned as raw JSON so they can be relayed verbatim.
#[async_trait]
pub trait ProcessingBackend: Send + Sync {
    async fn submit_job(&self, request: &QueueJobRequest) -> Result<QueueJobResponse, BackendError>;

    async fn list_jobs(&self, limit: usize) -> Result<Vec<serde_json::Value>, BackendError>;

    async fn job_status(&self, job_id: &str) -> Result<serde_json::Value, BackendError>;

    async fn cancel_job(&self, job_id: &str) -> Result<(), BackendError>;
}

/// HTTP implementation of [`ProcessingBackend`].
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    /// Create a client for the backend at `base_url`, e.g.
    /// `http://backend:8000`. `timeout` bounds each request; `None` keeps the
    /// `reqwest` defaults.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, BackendError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self::with_client(builder.build()?, base_url)
    }

    /// Create a backend client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, BackendError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| BackendError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Append path segments to the base URL. Segments are percent-encoded,
    /// so opaque job ids cannot escape their position in the path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code, returning a
    /// [`BackendError::Api`] with the status and body otherwise.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: extract_message(&body),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ProcessingBackend for HttpBackend {
    async fn submit_job(&self, request: &QueueJobRequest) -> Result<QueueJobResponse, BackendError> {
        let url = self.endpoint(&["api", "uploads", "queue"])?;
        let response = self.client.post(url).json(request).send().await?;
        let created: QueueJobResponse = Self::parse_response(response).await?;

        if created.job_id.trim().is_empty() {
            return Err(BackendError::UnexpectedBody(
                "job creation response carried an empty job_id".to_string(),
            ));
        }
        Ok(created)
    }

    async fn list_jobs(&self, limit: usize) -> Result<Vec<serde_json::Value>, BackendError> {
        let url = self.endpoint(&["api", "uploads", "jobs"])?;
        let response = self
            .client
            .get(url)
            .query(&[("limit", limit)])
            .send()
            .await?;
        let body: serde_json::Value = Self::parse_response(response).await?;
        job_list(body)
    }

    async fn job_status(&self, job_id: &str) -> Result<serde_json::Value, BackendError> {
        let url = self.endpoint(&["api", "uploads", "status", job_id])?;
        let response = self.client.get(url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(job_id.to_string()));
        }
        Self::parse_response(response).await
    }

    async fn cancel_job(&self, job_id: &str) -> Result<(), BackendError> {
        let url = self.endpoint(&["api", "uploads", "cancel", job_id])?;
        let response = self.client.post(url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(job_id.to_string()));
        }
        Self::ensure_success(response).await?;
        Ok(())
    }
}

/// Accept either a bare array or an object wrapping one under `jobs`/`data`.
fn job_list(body: serde_json::Value) -> Result<Vec<serde_json::Value>, BackendError> {
    match body {
        serde_json::Value::Array(jobs) => Ok(jobs),
        serde_json::Value::Object(mut map) => {
            match map.remove("jobs").or_else(|| map.remove("data")) {
                Some(serde_json::Value::Array(jobs)) => Ok(jobs),
                _ => Err(BackendError::UnexpectedBody(
                    "job list is neither an array nor an object with a `jobs` array".to_string(),
                )),
            }
        }
        other => Err(BackendError::UnexpectedBody(format!(
            "job list has unexpected type: {other}"
        ))),
    }
}
