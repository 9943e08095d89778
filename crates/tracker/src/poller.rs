//! Scheduled status polling for tracked uploads.
//!
//! [`spawn_poller`] moves an [`UploadTracker`] into a single task. Every
//! change (timer ticks, submissions, cancellations, manual refreshes) is
//! applied on that task, and observers read [`TrackerSnapshot`]s from a
//! watch channel. Stopping the returned [`PollerHandle`] cancels the timer;
//! a request already in flight is allowed to finish.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use loyalty_core::types::JobId;
use loyalty_core::upload_job::UploadJob;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::TrackerError;
use crate::tracker::{TrackerSnapshot, UploadTracker};

/// Default delay between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Capacity of the command queue feeding the poller task.
const COMMAND_BUFFER: usize = 64;

/// Where the poller reads job statuses from and sends cancellations to.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Statuses for `ids`. Ids the source cannot resolve may be omitted.
    async fn fetch_statuses(&self, ids: &[JobId]) -> Result<Vec<UploadJob>, TrackerError>;

    async fn request_cancel(&self, id: &str) -> Result<(), TrackerError>;
}

#[derive(Debug)]
enum Command {
    Track(UploadJob),
    Cancel(JobId),
    Refresh,
}

/// Handle to a running poller task.
pub struct PollerHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<TrackerSnapshot>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Start tracking a freshly submitted job.
    pub async fn track(&self, job: UploadJob) {
        self.send(Command::Track(job)).await;
    }

    /// Mark `id` failed immediately and ask the source to cancel it.
    pub async fn cancel_job(&self, id: impl Into<JobId>) {
        self.send(Command::Cancel(id.into())).await;
    }

    /// Poll now instead of waiting for the next tick.
    pub async fn refresh(&self) {
        self.send(Command::Refresh).await;
    }

    /// A receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<TrackerSnapshot> {
        self.snapshots.clone()
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> TrackerSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Stop polling and wait for the task to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Upload poller task ended abnormally");
        }
    }

    async fn send(&self, command: Command) {
        if self.commands.send(command).await.is_err() {
            tracing::warn!("Upload poller is no longer running; command dropped");
        }
    }
}

/// Spawn the polling task on the current runtime.
pub fn spawn_poller<S>(source: Arc<S>, interval: Duration) -> PollerHandle
where
    S: StatusSource + ?Sized + 'static,
{
    let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
    let (publisher, snapshots) = watch::channel(TrackerSnapshot::default());
    let cancel = CancellationToken::new();

    let task = tokio::spawn(run(source, interval, rx, publisher, cancel.clone()));

    PollerHandle {
        commands,
        snapshots,
        cancel,
        task,
    }
}

async fn run<S>(
    source: Arc<S>,
    interval: Duration,
    mut commands: mpsc::Receiver<Command>,
    publisher: watch::Sender<TrackerSnapshot>,
    cancel: CancellationToken,
) where
    S: StatusSource + ?Sized,
{
    let mut tracker = UploadTracker::new();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    tracing::debug!(interval_ms = interval.as_millis() as u64, "Upload poller started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("Upload poller stopping");
                break;
            }
            _ = ticker.tick() => {
                poll_once(source.as_ref(), &mut tracker, &publisher).await;
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    tracing::debug!("Upload poller handle dropped");
                    break;
                };
                match command {
                    Command::Track(job) => {
                        tracing::info!(job_id = %job.id, file_name = %job.file_name, "Tracking upload");
                        tracker.track(job);
                        publish(&tracker, &publisher);
                    }
                    Command::Cancel(id) => {
                        if tracker.mark_cancelled(&id) {
                            publish(&tracker, &publisher);
                        }
                        // No rollback: the local state stays failed even if
                        // the request is rejected.
                        if let Err(e) = source.request_cancel(&id).await {
                            tracing::warn!(job_id = %id, error = %e, "Cancellation request failed");
                        } else {
                            tracing::info!(job_id = %id, "Cancellation requested");
                        }
                    }
                    Command::Refresh => {
                        poll_once(source.as_ref(), &mut tracker, &publisher).await;
                    }
                }
            }
        }
    }
}

async fn poll_once<S>(
    source: &S,
    tracker: &mut UploadTracker,
    publisher: &watch::Sender<TrackerSnapshot>,
) where
    S: StatusSource + ?Sized,
{
    let ids = tracker.active_ids();
    if ids.is_empty() {
        return;
    }

    match source.fetch_statuses(&ids).await {
        Ok(updates) => {
            let changed = tracker.apply(updates);
            tracing::debug!(polled = ids.len(), changed, "Polled upload statuses");
            if changed > 0 {
                publish(tracker, publisher);
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, polled = ids.len(), "Status poll failed");
        }
    }
}

fn publish(tracker: &UploadTracker, publisher: &watch::Sender<TrackerSnapshot>) {
    publisher.send_replace(tracker.snapshot());
}
