//! In-memory registry of submitted upload jobs.
//!
//! Jobs enter as `uploading` when submitted and then only move on status the
//! API reports, except for optimistic cancellation. A job seen in a terminal
//! state leaves the active collection for the completed one and is never
//! updated again.

use indexmap::IndexMap;
use loyalty_core::types::JobId;
use loyalty_core::upload_job::{JobStatus, UploadJob};
use serde::Serialize;

/// Error message recorded on a job cancelled from this client.
pub const CANCELLED_MESSAGE: &str = "Cancelled by user";

/// Active and completed jobs, each in insertion order.
#[derive(Debug, Default)]
pub struct UploadTracker {
    active: IndexMap<JobId, UploadJob>,
    completed: IndexMap<JobId, UploadJob>,
}

/// Point-in-time copy of the tracker for observers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackerSnapshot {
    pub active: Vec<UploadJob>,
    pub completed: Vec<UploadJob>,
}

impl TrackerSnapshot {
    pub fn find(&self, id: &str) -> Option<&UploadJob> {
        self.active
            .iter()
            .chain(self.completed.iter())
            .find(|job| job.id == id)
    }
}

impl UploadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job. Already-known ids are left untouched.
    pub fn track(&mut self, job: UploadJob) {
        if self.contains(&job.id) {
            return;
        }
        if job.status.is_terminal() {
            self.completed.insert(job.id.clone(), job);
        } else {
            self.active.insert(job.id.clone(), job);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.active.contains_key(id) || self.completed.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&UploadJob> {
        self.active.get(id).or_else(|| self.completed.get(id))
    }

    /// Ids to poll for.
    pub fn active_ids(&self) -> Vec<JobId> {
        self.active.keys().cloned().collect()
    }

    pub fn active(&self) -> impl Iterator<Item = &UploadJob> {
        self.active.values()
    }

    pub fn completed(&self) -> impl Iterator<Item = &UploadJob> {
        self.completed.values()
    }

    /// Merge polled statuses by id and return how many jobs changed.
    ///
    /// Updates for unknown or already-completed jobs are ignored. Fields the
    /// status payload leaves empty keep their local values.
    pub fn apply(&mut self, updates: Vec<UploadJob>) -> usize {
        let mut changed = 0;

        for update in updates {
            let Some(current) = self.active.get_mut(&update.id) else {
                continue;
            };

            let merged = merge(current, update);
            if merged != *current {
                *current = merged;
                changed += 1;
            }

            if current.status.is_terminal() {
                let id = current.id.clone();
                if let Some(job) = self.active.shift_remove(&id) {
                    tracing::debug!(job_id = %id, status = %job.status, "Job reached terminal state");
                    self.completed.insert(id, job);
                }
            }
        }

        changed
    }

    /// Mark an active job failed right away, ahead of the API confirming the
    /// cancellation. Returns `false` when the job is not active.
    pub fn mark_cancelled(&mut self, id: &str) -> bool {
        let Some(mut job) = self.active.shift_remove(id) else {
            return false;
        };
        job.status = JobStatus::Failed;
        job.error_message = Some(CANCELLED_MESSAGE.to_string());
        self.completed.insert(job.id.clone(), job);
        true
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            active: self.active.values().cloned().collect(),
            completed: self.completed.values().cloned().collect(),
        }
    }
}

fn merge(current: &UploadJob, update: UploadJob) -> UploadJob {
    UploadJob {
        id: current.id.clone(),
        file_name: non_empty_or(update.file_name, &current.file_name),
        status: update.status,
        progress: update.progress,
        created_at: current.created_at,
        branch_id: non_empty_or(update.branch_id, &current.branch_id),
        error_message: update.error_message.or_else(|| current.error_message.clone()),
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}
