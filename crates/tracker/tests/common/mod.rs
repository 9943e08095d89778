#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use loyalty_api::config::{CancelMode, ServerConfig};
use loyalty_api::router::build_app_router;
use loyalty_api::state::AppState;
use loyalty_backend::{BackendError, ProcessingBackend, QueueJobRequest, QueueJobResponse};
use loyalty_tracker::client::QueueClient;
use serde_json::{json, Value};

/// Processing backend kept in memory so tests can move jobs along by hand.
#[derive(Default)]
pub struct ScriptedBackend {
    pub statuses: Mutex<HashMap<String, Value>>,
    pub submitted: Mutex<Vec<QueueJobRequest>>,
    pub cancelled: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    /// Overwrite the status the backend reports for `id`.
    pub fn set_status(&self, id: &str, status: &str, processed: u32, total: u32) {
        let mut statuses = self.statuses.lock().unwrap();
        let entry = statuses.entry(id.to_string()).or_insert_with(|| {
            json!({ "id": id, "created_at": "2026-03-01T09:00:00Z" })
        });
        entry["status"] = json!(status);
        entry["progress"] = json!({
            "processed": processed,
            "total": total,
            "failed": 0,
            "skipped": 0
        });
    }
}

#[async_trait]
impl ProcessingBackend for ScriptedBackend {
    async fn submit_job(&self, request: &QueueJobRequest) -> Result<QueueJobResponse, BackendError> {
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(request.clone());
        let job_id = format!("job-{}", submitted.len());
        drop(submitted);

        self.statuses.lock().unwrap().insert(
            job_id.clone(),
            json!({
                "id": job_id,
                "file_name": request.file_name,
                "branch_id": request.branch_id,
                "status": "queued",
                "progress": { "processed": 0, "total": request.transactions.len(), "failed": 0, "skipped": 0 },
                "created_at": "2026-03-01T09:00:00Z"
            }),
        );
        Ok(QueueJobResponse {
            job_id,
            message: Some(format!("Queued {} transactions", request.transactions.len())),
        })
    }

    async fn list_jobs(&self, _limit: usize) -> Result<Vec<Value>, BackendError> {
        Ok(self.statuses.lock().unwrap().values().cloned().collect())
    }

    async fn job_status(&self, job_id: &str) -> Result<Value, BackendError> {
        self.statuses
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(job_id.to_string()))
    }

    async fn cancel_job(&self, job_id: &str) -> Result<(), BackendError> {
        self.cancelled.lock().unwrap().push(job_id.to_string());
        Ok(())
    }
}

/// Serve the upload-queue API around `backend` on an ephemeral port and
/// return a client pointed at it.
pub async fn spawn_api(backend: Arc<ScriptedBackend>, cancel_mode: CancelMode) -> QueueClient {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        backend_url: "http://backend.invalid".to_string(),
        backend_timeout_secs: None,
        cancel_mode,
        max_upload_bytes: 1024 * 1024,
    };
    let state = AppState {
        config: Arc::new(config.clone()),
        backend,
    };
    let app = build_app_router(state, &config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    QueueClient::new(&format!("http://{addr}")).unwrap()
}

pub const SAMPLE_CSV: &str = "Mobile Number,Amount,Date,Description\n\
0501234567,120.50,2026-03-01,Coffee\n\
0509876543,80,01/03/2026,\n";
