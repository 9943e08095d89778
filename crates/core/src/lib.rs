//! Domain types and pure logic for the loyalty upload queue.
//!
//! No network I/O lives here: the proxy, the backend client and the tracker
//! all build on these types.

pub mod error;
pub mod spreadsheet;
pub mod transactions;
pub mod types;
pub mod upload_job;
