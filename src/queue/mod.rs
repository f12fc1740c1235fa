//! In-memory job queue with priorities, retry with exponential backoff,
//! lease-based delivery, and bounded retention of finished jobs.
//!
//! Queue state lives behind one mutex and every operation is synchronous, so
//! progress observers running inside batch loops can update job state without
//! an async context. Workers park on a `Notify` handle between jobs.

mod job;
mod worker;

pub use job::{Job, JobKind, JobPayload, JobProgress, JobState, QueueStats};
pub use worker::{JobHandler, QueueWorker};

use crate::config::QueueConfig;
use crate::error::QueueError;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::Notify;

pub struct JobQueue {
    config: QueueConfig,
    jobs: Mutex<HashMap<String, Job>>,
    notify: Notify,
}

impl JobQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            jobs: Mutex::new(HashMap::new()),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Job>> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Enqueue a job with its kind's default priority
    pub fn enqueue(&self, kind: JobKind, payload: JobPayload) -> Result<String, QueueError> {
        let priority = kind.default_priority();
        self.enqueue_with_priority(kind, payload, priority)
    }

    pub fn enqueue_with_priority(
        &self,
        kind: JobKind,
        payload: JobPayload,
        priority: u8,
    ) -> Result<String, QueueError> {
        self.enqueue_at(kind, payload, priority, Utc::now())
    }

    /// Enqueue with an explicit clock, used by tests for determinism.
    ///
    /// A pending job (waiting or delayed) for the same repository and kind is
    /// merged instead of duplicated: changed files are unioned, the delivery
    /// id is replaced by the newest one, and the lower priority value wins.
    pub fn enqueue_at(
        &self,
        kind: JobKind,
        payload: JobPayload,
        priority: u8,
        now: DateTime<Utc>,
    ) -> Result<String, QueueError> {
        if payload.repository_id.is_empty() {
            return Err(QueueError::InvalidPayload {
                id: payload.full_name.clone(),
                reason: "repository_id is empty".to_string(),
            });
        }

        let mut jobs = self.lock();

        if let Some(existing) = jobs.values_mut().find(|j| {
            j.kind == kind
                && j.payload.repository_id == payload.repository_id
                && matches!(j.state, JobState::Waiting | JobState::Delayed)
        }) {
            for file in payload.changed_files {
                if !existing.payload.changed_files.contains(&file) {
                    existing.payload.changed_files.push(file);
                }
            }
            if payload.delivery_id.is_some() {
                existing.payload.delivery_id = payload.delivery_id;
            }
            for doc_type in payload.doc_types {
                if !existing.payload.doc_types.contains(&doc_type) {
                    existing.payload.doc_types.push(doc_type);
                }
            }
            existing.priority = existing.priority.min(priority);
            let id = existing.id.clone();
            tracing::debug!(id = %id, kind = %kind, "merged into pending job");
            drop(jobs);
            self.notify.notify_one();
            return Ok(id);
        }

        let mut millis = now.timestamp_millis();
        let mut id = format!("{}-{}", payload.repository_id, millis);
        while jobs.contains_key(&id) {
            millis += 1;
            id = format!("{}-{}", payload.repository_id, millis);
        }

        let job = Job {
            id: id.clone(),
            kind,
            payload,
            priority,
            state: JobState::Waiting,
            attempts_made: 0,
            progress: JobProgress::default(),
            enqueued_at: now,
            started_at: None,
            finished_at: None,
            not_before: None,
            lease_expires_at: None,
            result: None,
            error: None,
        };
        tracing::info!(id = %id, kind = %kind, priority, "job enqueued");
        jobs.insert(id.clone(), job);
        drop(jobs);
        self.notify.notify_one();
        Ok(id)
    }

    /// Lease the next ready job, marking it active.
    ///
    /// Promotes due delayed jobs and reclaims expired leases first. Ready
    /// jobs are served lowest priority value first, ties broken by enqueue
    /// time.
    pub fn lease_next(&self) -> Option<Job> {
        self.lease_next_at(Utc::now())
    }

    pub fn lease_next_at(&self, now: DateTime<Utc>) -> Option<Job> {
        let mut jobs = self.lock();

        for job in jobs.values_mut() {
            match job.state {
                JobState::Delayed if job.not_before.is_none_or(|t| t <= now) => {
                    job.state = JobState::Waiting;
                    job.not_before = None;
                }
                JobState::Active if job.lease_expires_at.is_some_and(|t| t <= now) => {
                    tracing::warn!(id = %job.id, "lease expired, job returned to queue");
                    job.state = JobState::Waiting;
                    job.lease_expires_at = None;
                }
                _ => {}
            }
        }

        let next_id = jobs
            .values()
            .filter(|j| j.state == JobState::Waiting)
            .min_by_key(|j| (j.priority, j.enqueued_at, j.id.clone()))?
            .id
            .clone();

        let job = jobs.get_mut(&next_id)?;
        job.state = JobState::Active;
        job.attempts_made += 1;
        job.started_at = Some(now);
        job.lease_expires_at =
            Some(now + ChronoDuration::from_std(self.config.lease_duration()).unwrap_or_default());
        Some(job.clone())
    }

    /// Record successful completion of an active job
    pub fn complete(&self, id: &str, result: serde_json::Value) -> Result<(), QueueError> {
        self.complete_at(id, result, Utc::now())
    }

    pub fn complete_at(
        &self,
        id: &str,
        result: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<(), QueueError> {
        let mut jobs = self.lock();
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| QueueError::JobNotFound(id.to_string()))?;
        if job.state != JobState::Active {
            return Err(QueueError::NotActive(id.to_string()));
        }
        job.state = JobState::Completed;
        job.finished_at = Some(now);
        job.lease_expires_at = None;
        job.result = Some(result);
        tracing::info!(id = %id, attempts = job.attempts_made, "job completed");
        Ok(())
    }

    /// Record a failed attempt.
    ///
    /// The job is re-scheduled with exponential backoff until its attempt
    /// budget is spent, then parked as failed. Returns the resulting state.
    pub fn fail(&self, id: &str, error: &str) -> Result<JobState, QueueError> {
        self.fail_at(id, error, Utc::now())
    }

    pub fn fail_at(
        &self,
        id: &str,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<JobState, QueueError> {
        let mut jobs = self.lock();
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| QueueError::JobNotFound(id.to_string()))?;
        if job.state != JobState::Active {
            return Err(QueueError::NotActive(id.to_string()));
        }

        job.error = Some(error.to_string());
        job.lease_expires_at = None;

        if job.attempts_made >= self.config.max_attempts {
            job.state = JobState::Failed;
            job.finished_at = Some(now);
            tracing::error!(id = %id, attempts = job.attempts_made, error, "job failed permanently");
            return Ok(JobState::Failed);
        }

        let delay = self.config.backoff().delay_for(job.attempts_made);
        job.state = JobState::Delayed;
        job.not_before = Some(now + ChronoDuration::from_std(delay).unwrap_or_default());
        tracing::warn!(
            id = %id,
            attempt = job.attempts_made,
            delay_ms = delay.as_millis() as u64,
            error,
            "job attempt failed, retry scheduled"
        );
        drop(jobs);
        self.notify.notify_one();
        Ok(JobState::Delayed)
    }

    /// Park an active job as failed immediately, bypassing remaining
    /// retries. Used for errors that cannot succeed on a later attempt.
    pub fn discard(&self, id: &str, error: &str) -> Result<(), QueueError> {
        let mut jobs = self.lock();
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| QueueError::JobNotFound(id.to_string()))?;
        if job.state != JobState::Active {
            return Err(QueueError::NotActive(id.to_string()));
        }
        job.state = JobState::Failed;
        job.error = Some(error.to_string());
        job.finished_at = Some(Utc::now());
        job.lease_expires_at = None;
        tracing::error!(id = %id, attempts = job.attempts_made, error, "job discarded");
        Ok(())
    }

    /// Update progress of an active job
    pub fn set_progress(&self, id: &str, processed: usize, total: usize) -> Result<(), QueueError> {
        let mut jobs = self.lock();
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| QueueError::JobNotFound(id.to_string()))?;
        if job.state != JobState::Active {
            return Err(QueueError::NotActive(id.to_string()));
        }
        job.progress = JobProgress { processed, total };
        Ok(())
    }

    pub fn status(&self, id: &str) -> Option<Job> {
        self.lock().get(id).cloned()
    }

    pub fn stats(&self) -> QueueStats {
        let jobs = self.lock();
        let mut stats = QueueStats::default();
        for job in jobs.values() {
            match job.state {
                JobState::Waiting => stats.waiting += 1,
                JobState::Delayed => stats.delayed += 1,
                JobState::Active => stats.active += 1,
                JobState::Completed => stats.completed += 1,
                JobState::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Evict finished jobs past their retention windows. Completed jobs are
    /// additionally capped by count, oldest evicted first. Failed jobs are
    /// kept longer for postmortem inspection.
    pub fn sweep_retention(&self) -> usize {
        self.sweep_retention_at(Utc::now())
    }

    pub fn sweep_retention_at(&self, now: DateTime<Utc>) -> usize {
        let completed_cutoff = now - ChronoDuration::hours(self.config.completed_retention_hours as i64);
        let failed_cutoff = now - ChronoDuration::days(self.config.failed_retention_days as i64);

        let mut jobs = self.lock();
        let before = jobs.len();

        jobs.retain(|_, job| match job.state {
            JobState::Completed => job.finished_at.is_none_or(|t| t > completed_cutoff),
            JobState::Failed => job.finished_at.is_none_or(|t| t > failed_cutoff),
            _ => true,
        });

        let mut completed: Vec<(String, DateTime<Utc>)> = jobs
            .values()
            .filter(|j| j.state == JobState::Completed)
            .map(|j| (j.id.clone(), j.finished_at.unwrap_or(j.enqueued_at)))
            .collect();
        if completed.len() > self.config.completed_max {
            completed.sort_by_key(|(_, finished)| *finished);
            let excess = completed.len() - self.config.completed_max;
            for (id, _) in completed.into_iter().take(excess) {
                jobs.remove(&id);
            }
        }

        let evicted = before - jobs.len();
        if evicted > 0 {
            tracing::debug!(evicted, "retention sweep evicted finished jobs");
        }
        evicted
    }

    /// Await the next enqueue or retry-schedule event
    pub async fn notified(&self) {
        self.notify.notified().await;
    }
}
