//! Client library for the external spreadsheet-processing backend.
//!
//! [`ProcessingBackend`] is the seam the upload-queue proxy talks through;
//! [`HttpBackend`] is the production implementation over `reqwest`.

pub mod api;
pub mod error;

pub use api::{HttpBackend, ProcessingBackend, QueueJobRequest, QueueJobResponse};
pub use error::BackendError;
