//! Client-side tracking of spreadsheet upload jobs.
//!
//! [`tracker::UploadTracker`] holds the active/completed collections,
//! [`poller`] drives it from a cancellable scheduled task, and
//! [`client::QueueClient`] talks to the upload-queue API.

pub mod client;
pub mod display;
pub mod error;
pub mod poller;
pub mod tracker;

pub use error::TrackerError;
