use crate::error::ProcessorError;
use crate::job::{Job, JobResult};

/// Caller-supplied batch executor.
///
/// Called with jobs in admission order; must return one result per job,
/// matched by id. May block: the batcher runs it off the async workers and
/// waits for it before cutting the next batch.
pub trait BatchProcessor: Send + Sync + 'static {
    fn process(&self, jobs: Vec<Job>) -> Result<Vec<JobResult>, ProcessorError>;
}

impl<F> BatchProcessor for F
where
    F: Fn(Vec<Job>) -> Result<Vec<JobResult>, ProcessorError> + Send + Sync + 'static,
{
    fn process(&self, jobs: Vec<Job>) -> Result<Vec<JobResult>, ProcessorError> {
        self(jobs)
    }
}
