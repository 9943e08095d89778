/// Errors raised while talking to the upload-queue API.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The HTTP request itself failed (network, DNS, TLS, body decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("Upload queue API error ({status}): {message}")]
    Api {
        status: u16,
        /// `code` field of the error body, e.g. `VALIDATION_ERROR`.
        code: Option<String>,
        message: String,
    },

    /// Reading the file to upload failed.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}
