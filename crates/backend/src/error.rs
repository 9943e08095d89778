use loyalty_core::error::CoreError;

/// Errors from the processing-backend client.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The HTTP request itself failed (network, DNS, TLS, body decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend does not know the requested job.
    #[error("Job {0} not found upstream")]
    NotFound(String),

    /// The backend returned a non-2xx status code.
    #[error("Backend API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// `message`/`error`/`detail` field of a JSON error body, if any.
        message: Option<String>,
        /// Raw response body for debugging.
        body: String,
    },

    /// The backend answered 2xx with a body of the wrong shape.
    #[error("Unexpected backend response: {0}")]
    UnexpectedBody(String),

    /// The configured base URL cannot address the requested endpoint.
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl BackendError {
    /// Convert into the domain taxonomy.
    ///
    /// Non-2xx answers become [`CoreError::Upstream`] with the backend's
    /// status and message, falling back to `default_message`. Transport
    /// failures become [`CoreError::Internal`] carrying their own message.
    pub fn into_core(self, default_message: &str) -> CoreError {
        match self {
            BackendError::NotFound(id) => CoreError::NotFound {
                entity: "UploadJob",
                id,
            },
            BackendError::Api {
                status, message, ..
            } => CoreError::Upstream {
                status: Some(status),
                message: message.unwrap_or_else(|| default_message.to_string()),
            },
            other => {
                let message = other.to_string();
                CoreError::Internal(if message.is_empty() {
                    default_message.to_string()
                } else {
                    message
                })
            }
        }
    }
}

/// Pull a human-readable message out of a JSON error body.
pub(crate) fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error", "detail"]
        .iter()
        .find_map(|key| value.get(*key)?.as_str())
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}
