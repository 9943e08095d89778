/// Domain-level error taxonomy shared by the proxy and the tracker.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The processing backend failed or answered with a non-2xx status.
    ///
    /// `status` is the backend's HTTP status when one was received.
    #[error("Upstream error ({status:?}): {message}")]
    Upstream { status: Option<u16>, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}
