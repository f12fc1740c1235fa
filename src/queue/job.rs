//! Job model for the documentation queue.

use crate::types::DocType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three kinds of work the pipeline performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    /// Full repository analysis: extract, embed, store
    AnalyzeRepository,
    /// Incremental analysis of a changed-file set
    AnalyzeChangedFiles,
    /// Documentation generation over previously extracted chunks
    GenerateDocumentation,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::AnalyzeRepository => "analyze-repository",
            JobKind::AnalyzeChangedFiles => "analyze-changed-files",
            JobKind::GenerateDocumentation => "generate-documentation",
        }
    }

    /// Lower value is served first. Incremental updates jump ahead of full
    /// scans so push events stay responsive.
    pub fn default_priority(&self) -> u8 {
        match self {
            JobKind::AnalyzeChangedFiles => 1,
            JobKind::GenerateDocumentation => 5,
            JobKind::AnalyzeRepository => 10,
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Work description carried by a job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobPayload {
    /// Stable repository identifier, also the vector-store partition key
    pub repository_id: String,
    /// Human-readable name, e.g. "acme/app"
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Files to re-analyze; empty means the whole repository
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    /// Identifier of the webhook delivery that requested this job
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_id: Option<String>,
    /// Documentation types requested for generation jobs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub doc_types: Vec<DocType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Ready to be leased
    Waiting,
    /// Scheduled for a later attempt after a failure
    Delayed,
    /// Leased by a worker
    Active,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub processed: usize,
    pub total: usize,
}

/// One unit of queued work with its full lifecycle state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub kind: JobKind,
    pub payload: JobPayload,
    pub priority: u8,
    pub state: JobState,
    /// Attempts started so far, including the current one when active
    pub attempts_made: u32,
    pub progress: JobProgress,
    pub enqueued_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Delayed jobs become leasable at this instant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,
    /// Active leases past this instant are reclaimed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, JobState::Completed | JobState::Failed)
    }
}

/// Per-state job counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub waiting: usize,
    pub delayed: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
}
