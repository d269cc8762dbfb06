//! Error model.

use thiserror::Error;

use crate::job::JobId;

/// Failure surfaced through a job's pending result.
///
/// Capacity and shutdown rejections are not errors at this level: they
/// resolve to a [`JobResult`](crate::JobResult) carrying `JobStatus::Error`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// No job was supplied.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The scheduler was asked to start outside a tokio runtime.
    #[error("no tokio runtime available to run the batch scheduler")]
    NoRuntime,
}

impl BatchError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Fault reported by a [`BatchProcessor`](crate::BatchProcessor) for a whole batch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProcessorError {
    #[error("batch processing failed: {0}")]
    Failed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// A pending result was resolved a second time.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("job result already resolved (job: {job_id:?})")]
pub struct AlreadyResolved {
    /// `None` for handles that never carried a job (absent-job failures).
    pub job_id: Option<JobId>,
}
