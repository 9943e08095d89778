use std::sync::Arc;

use loyalty_backend::ProcessingBackend;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Client for the external spreadsheet-processing backend.
    pub backend: Arc<dyn ProcessingBackend>,
}
