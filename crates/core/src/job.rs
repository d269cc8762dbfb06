//! Value records flowing through the batcher.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Caller-supplied job identifier.
///
/// Uniqueness is the caller's responsibility; the batcher deduplicates
/// resubmissions of an id it already knows.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl JobId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for JobId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A unit of submitted work.
///
/// Immutable once constructed: fields are only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    id: JobId,
    content: String,
    created_at: DateTime<Utc>,
}

impl Job {
    /// Create a job stamped with the current UTC time.
    pub fn new(id: i64, content: impl Into<String>) -> Self {
        Self::with_id(JobId(id), content)
    }

    pub fn with_id(id: JobId, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// Opaque payload handed to the batch processor.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Outcome of a single job.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Success,
    Error,
}

impl JobStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Success)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Success => f.write_str("Success"),
            JobStatus::Error => f.write_str("Error"),
        }
    }
}

/// Result produced exactly once per admitted job.
///
/// Either the processor builds it, or the batcher synthesises an `Error`
/// result when a job is rejected at admission or its batch faults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: JobId,
    pub status: JobStatus,
    pub details: Option<String>,
    pub processed_at: DateTime<Utc>,
}

impl JobResult {
    pub fn new(job_id: JobId, status: JobStatus, details: Option<String>) -> Self {
        Self {
            job_id,
            status,
            details,
            processed_at: Utc::now(),
        }
    }

    pub fn success(job_id: JobId, details: impl Into<String>) -> Self {
        Self::new(job_id, JobStatus::Success, Some(details.into()))
    }

    pub fn error(job_id: JobId, details: impl Into<String>) -> Self {
        Self::new(job_id, JobStatus::Error, Some(details.into()))
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

impl fmt::Display for JobResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JobId: {}, Status: {}, Details: {}",
            self.job_id,
            self.status,
            self.details.as_deref().unwrap_or("NA")
        )
    }
}
