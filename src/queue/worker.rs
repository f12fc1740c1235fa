//! Queue worker loop.
//!
//! Leases jobs one at a time, dispatches them to a handler, and records the
//! outcome back on the queue. Shutdown is cooperative through a cancellation
//! token; an in-flight job finishes before the loop exits.

use super::{Job, JobQueue};
use crate::error::DocgenError;
use crate::progress::ProgressObserver;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Executes one job and returns its result payload
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(
        &self,
        job: &Job,
        progress: &dyn ProgressObserver,
    ) -> anyhow::Result<serde_json::Value>;
}

/// Bridges handler progress events onto the job's queue record
struct JobProgressBridge {
    queue: Arc<JobQueue>,
    job_id: String,
}

impl ProgressObserver for JobProgressBridge {
    fn on_progress(&self, processed: usize, total: usize) {
        // The job may have been reclaimed meanwhile; progress is best-effort
        let _ = self.queue.set_progress(&self.job_id, processed, total);
    }
}

pub struct QueueWorker {
    queue: Arc<JobQueue>,
    handler: Arc<dyn JobHandler>,
    /// Poll interval for delayed-job promotion while idle
    idle_tick: Duration,
}

impl QueueWorker {
    pub fn new(queue: Arc<JobQueue>, handler: Arc<dyn JobHandler>) -> Self {
        Self {
            queue,
            handler,
            idle_tick: Duration::from_secs(1),
        }
    }

    pub fn with_idle_tick(mut self, tick: Duration) -> Self {
        self.idle_tick = tick;
        self
    }

    /// Run until the token is cancelled. Parks on the queue's notify handle
    /// while empty, waking on a tick so due delayed jobs get promoted.
    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!("queue worker started");
        loop {
            if shutdown.is_cancelled() {
                break;
            }
            match self.queue.lease_next() {
                Some(job) => self.process(job).await,
                None => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = self.queue.notified() => {}
                        _ = tokio::time::sleep(self.idle_tick) => {}
                    }
                }
            }
        }
        tracing::info!("queue worker stopped");
    }

    async fn process(&self, job: Job) {
        tracing::info!(
            id = %job.id,
            kind = %job.kind,
            attempt = job.attempts_made,
            "job started"
        );
        let bridge = JobProgressBridge {
            queue: self.queue.clone(),
            job_id: job.id.clone(),
        };

        match self.handler.handle(&job, &bridge).await {
            Ok(result) => {
                if let Err(err) = self.queue.complete(&job.id, result) {
                    tracing::warn!(id = %job.id, "could not record completion: {}", err);
                }
            }
            Err(err) => {
                let message = format!("{:#}", err);
                // Permanent errors (auth, bad request) skip the retry path;
                // errors of unknown provenance stay retryable
                let retryable = err
                    .downcast_ref::<DocgenError>()
                    .map(DocgenError::is_retryable)
                    .unwrap_or(true);

                let recorded = if retryable {
                    self.queue.fail(&job.id, &message).map(|state| {
                        tracing::warn!(id = %job.id, ?state, "job attempt failed: {}", message);
                    })
                } else {
                    self.queue.discard(&job.id, &message)
                };
                if let Err(err) = recorded {
                    tracing::warn!(id = %job.id, "could not record failure: {}", err);
                }
            }
        }
    }
}
