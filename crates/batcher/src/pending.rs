//! Single-assignment result handles, one per admitted job.

use std::collections::HashMap;
use std::future::{Future, IntoFuture};
use std::pin::{Pin, pin};
use std::sync::{Arc, OnceLock};

use tokio::sync::Notify;

use microbatch_core::{AlreadyResolved, BatchError, JobId, JobResult};

/// What a pending result eventually yields.
pub type JobOutcome = Result<JobResult, BatchError>;

#[derive(Debug)]
struct Slot {
    job_id: Option<JobId>,
    value: OnceLock<JobOutcome>,
    resolved: Notify,
}

/// Handle to a job's eventual result.
///
/// Clones share one slot: every clone observes the same single resolution.
/// Await it directly (`handle.await`) or via [`PendingResult::wait`].
#[derive(Debug, Clone)]
pub struct PendingResult {
    slot: Arc<Slot>,
}

impl PendingResult {
    pub(crate) fn new(job_id: JobId) -> Self {
        Self::from_slot(Some(job_id), OnceLock::new())
    }

    /// A handle that is already resolved, for admission-time outcomes.
    pub(crate) fn ready(job_id: Option<JobId>, outcome: JobOutcome) -> Self {
        Self::from_slot(job_id, OnceLock::from(outcome))
    }

    fn from_slot(job_id: Option<JobId>, value: OnceLock<JobOutcome>) -> Self {
        Self {
            slot: Arc::new(Slot {
                job_id,
                value,
                resolved: Notify::new(),
            }),
        }
    }

    /// Job this handle belongs to; `None` when no job was supplied.
    pub fn job_id(&self) -> Option<JobId> {
        self.slot.job_id
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.value.get().is_some()
    }

    /// Current outcome without waiting.
    pub fn try_result(&self) -> Option<JobOutcome> {
        self.slot.value.get().cloned()
    }

    /// True when both handles refer to the same job slot.
    pub fn same_as(&self, other: &PendingResult) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    /// Resolve the slot. A second resolution is rejected, never overwrites.
    pub(crate) fn resolve(&self, outcome: JobOutcome) -> Result<(), AlreadyResolved> {
        self.slot.value.set(outcome).map_err(|_| AlreadyResolved {
            job_id: self.slot.job_id,
        })?;
        self.slot.resolved.notify_waiters();
        Ok(())
    }

    /// Wait until the slot is resolved.
    pub async fn wait(&self) -> JobOutcome {
        loop {
            // Register interest before checking, so a resolve between the
            // check and the await still wakes us.
            let mut notified = pin!(self.slot.resolved.notified());
            notified.as_mut().enable();

            if let Some(outcome) = self.slot.value.get() {
                return outcome.clone();
            }

            notified.await;
        }
    }
}

impl IntoFuture for PendingResult {
    type Output = JobOutcome;
    type IntoFuture = Pin<Box<dyn Future<Output = JobOutcome> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.wait().await })
    }
}

/// Job id to pending handle. Entries are never removed.
#[derive(Debug, Default)]
pub struct PendingResultTable {
    entries: HashMap<JobId, PendingResult>,
}

impl PendingResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, job_id: JobId) -> Option<&PendingResult> {
        self.entries.get(&job_id)
    }

    pub fn contains(&self, job_id: JobId) -> bool {
        self.entries.contains_key(&job_id)
    }

    /// Register a fresh handle for `job_id`, returning the existing one if the id is known.
    pub fn register(&mut self, job_id: JobId) -> PendingResult {
        self.entries
            .entry(job_id)
            .or_insert_with(|| PendingResult::new(job_id))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
