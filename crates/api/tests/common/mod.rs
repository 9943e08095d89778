#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use loyalty_api::config::{CancelMode, ServerConfig};
use loyalty_api::router::build_app_router;
use loyalty_api::state::AppState;
use loyalty_backend::{BackendError, ProcessingBackend, QueueJobRequest, QueueJobResponse};
use serde_json::Value;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(cancel_mode: CancelMode) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        backend_url: "http://backend.invalid".to_string(),
        backend_timeout_secs: None,
        cancel_mode,
        max_upload_bytes: 1024 * 1024,
    }
}

/// Build the full application router around `backend`, in acknowledge mode.
pub fn build_test_app(backend: Arc<FakeBackend>) -> Router {
    build_test_app_with(backend, CancelMode::Acknowledge)
}

/// Build the full application router around `backend` with the production
/// middleware stack.
pub fn build_test_app_with(backend: Arc<FakeBackend>, cancel_mode: CancelMode) -> Router {
    let config = test_config(cancel_mode);
    let state = AppState {
        config: Arc::new(config.clone()),
        backend,
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Fake processing backend
// ---------------------------------------------------------------------------

/// In-memory stand-in for the processing backend that records every call.
#[derive(Default)]
pub struct FakeBackend {
    /// Status payloads by job id. Unknown ids answer 404.
    pub statuses: Mutex<HashMap<String, Value>>,
    /// Ids whose status lookup fails with a 503.
    pub failing: Mutex<HashSet<String>>,
    /// Job list returned by `list_jobs`.
    pub jobs: Mutex<Vec<Value>>,
    /// When set, `submit_job` fails with this status and optional message.
    pub submit_error: Mutex<Option<(u16, Option<String>)>>,
    /// When set, `submit_job` fails as if the backend were unreachable.
    pub submit_unreachable: Mutex<bool>,
    /// Every job-creation request received.
    pub submitted: Mutex<Vec<QueueJobRequest>>,
    /// Every id passed to `cancel_job`.
    pub cancelled: Mutex<Vec<String>>,
    pub status_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_status(self: Arc<Self>, id: &str, status: Value) -> Arc<Self> {
        self.statuses.lock().unwrap().insert(id.to_string(), status);
        self
    }

    pub fn with_failing(self: Arc<Self>, id: &str) -> Arc<Self> {
        self.failing.lock().unwrap().insert(id.to_string());
        self
    }

    pub fn with_jobs(self: Arc<Self>, jobs: Vec<Value>) -> Arc<Self> {
        *self.jobs.lock().unwrap() = jobs;
        self
    }

    pub fn submit_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }
}

#[async_trait]
impl ProcessingBackend for FakeBackend {
    async fn submit_job(&self, request: &QueueJobRequest) -> Result<QueueJobResponse, BackendError> {
        self.submitted.lock().unwrap().push(request.clone());

        if *self.submit_unreachable.lock().unwrap() {
            return Err(BackendError::UnexpectedBody("connection refused".to_string()));
        }
        if let Some((status, message)) = self.submit_error.lock().unwrap().clone() {
            return Err(BackendError::Api {
                status,
                message,
                body: String::new(),
            });
        }

        let n = self.submitted.lock().unwrap().len();
        Ok(QueueJobResponse {
            job_id: format!("job-{n}"),
            message: Some(format!("Queued {} rows", request.transactions.len())),
        })
    }

    async fn list_jobs(&self, _limit: usize) -> Result<Vec<Value>, BackendError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.jobs.lock().unwrap().clone())
    }

    async fn job_status(&self, job_id: &str) -> Result<Value, BackendError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().contains(job_id) {
            return Err(BackendError::Api {
                status: 503,
                message: Some("status store offline".to_string()),
                body: String::new(),
            });
        }
        self.statuses
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(job_id.to_string()))
    }

    async fn cancel_job(&self, job_id: &str) -> Result<(), BackendError> {
        self.cancelled.lock().unwrap().push(job_id.to_string());
        if self.statuses.lock().unwrap().contains_key(job_id) {
            Ok(())
        } else {
            Err(BackendError::NotFound(job_id.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Send a bodiless request and return the response.
pub async fn send(app: Router, method: Method, uri: &str) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri).await
}

pub async fn delete(app: Router, uri: &str) -> Response {
    send(app, Method::DELETE, uri).await
}

/// Read the full response body as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// One part of a hand-built multipart body.
pub enum Part<'a> {
    Text { name: &'a str, value: &'a str },
    File { name: &'a str, file_name: &'a str, data: &'a [u8] },
}

const BOUNDARY: &str = "loyalty-test-boundary";

/// POST a `multipart/form-data` body built from `parts`.
pub async fn post_multipart(app: Router, uri: &str, parts: &[Part<'_>]) -> Response {
    let mut body: Vec<u8> = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File { name, file_name, data } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}
