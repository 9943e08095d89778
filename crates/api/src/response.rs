//! Success payloads of the upload-queue endpoints.
//!
//! These endpoints answer with a flat `{ "success": true, ... }` object
//! rather than a data envelope; status reads relay backend JSON as-is.

use serde::Serialize;

/// Response of `POST /api/upload-queue`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub job_id: String,
    pub message: String,
}

/// Acknowledgement of an accepted request with no other payload.
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub success: bool,
    pub message: String,
}

impl AckResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
