//! The flush loop.
//!
//! One task per batcher instance:
//!
//! 1. Idle until the queue is non-empty (wake-on-enqueue, coalesced).
//! 2. Sleep for the configured `frequency` so more jobs can accumulate.
//! 3. Drain up to `batch_size` jobs under the state lock, then release it.
//!    A zero `batch_size` drains nothing and parks the loop until the next wake.
//! 4. Run the processor off the async workers and publish every result.
//!
//! The loop exits once shutdown has been requested and the queue is empty.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use microbatch_core::{BatchProcessor, Job, JobId, JobResult, LogLevel};

use crate::pending::PendingResult;
use crate::service::Shared;

/// Lifecycle of the flush loop.
///
/// `NotStarted → Running → Draining → Stopped`; a stopped loop is never restarted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SchedulerState {
    NotStarted,
    Running,
    /// Shutdown observed while jobs were still queued.
    Draining,
    Stopped,
}

impl SchedulerState {
    pub fn is_processing(&self) -> bool {
        matches!(self, SchedulerState::Running | SchedulerState::Draining)
    }
}

/// Jobs cut from the queue together with their result handles.
pub(crate) struct Batch {
    pub(crate) jobs: Vec<Job>,
    pub(crate) handles: HashMap<JobId, PendingResult>,
}

pub(crate) async fn run<P: BatchProcessor>(shared: Arc<Shared<P>>) {
    shared.log(LogLevel::Debug, "Started processing.");

    loop {
        let (queued, shutdown) = shared.queue_snapshot();

        if shutdown && queued == 0 {
            break;
        }
        if shutdown {
            shared.transition(SchedulerState::Running, SchedulerState::Draining);
        }
        if queued == 0 {
            shared.wake.notified().await;
            continue;
        }

        let frequency = shared.options().frequency;
        tokio::time::sleep(frequency).await;

        let batch_size = shared.options().batch_size;
        let batch = shared.take_batch(batch_size);
        if batch.jobs.is_empty() {
            // batch_size is 0; park until the next wake.
            shared.wake.notified().await;
            continue;
        }

        shared.log(
            LogLevel::Debug,
            &format!("Processing batch of {} job(s)", batch.jobs.len()),
        );
        process_batch(&shared, batch).await;
    }

    shared.set_state(SchedulerState::Stopped);
    shared.log(LogLevel::Debug, "Finished processing.");
}

async fn process_batch<P: BatchProcessor>(shared: &Arc<Shared<P>>, batch: Batch) {
    let Batch { jobs, handles } = batch;
    let order: Vec<JobId> = jobs.iter().map(Job::id).collect();
    let processor = Arc::clone(&shared.processor);

    let detail = match tokio::task::spawn_blocking(move || processor.process(jobs)).await {
        Ok(Ok(results)) => {
            publish_results(shared, &order, handles, results);
            return;
        }
        Ok(Err(e)) => e.to_string(),
        Err(e) if e.is_panic() => {
            format!("batch processor panicked: {}", panic_detail(e.into_panic()))
        }
        Err(e) => format!("batch processor did not complete: {e}"),
    };

    shared.log(
        LogLevel::Error,
        &format!("Batch of {} job(s) failed: {detail}", order.len()),
    );
    for id in &order {
        if let Some(handle) = handles.get(id) {
            resolve(shared, handle, JobResult::error(*id, detail.clone()));
        }
    }
}

/// Match processor output to the batch.
///
/// Unknown ids and repeated ids are logged and dropped; jobs the processor
/// left out resolve to an error result.
fn publish_results<P: BatchProcessor>(
    shared: &Shared<P>,
    order: &[JobId],
    mut handles: HashMap<JobId, PendingResult>,
    results: Vec<JobResult>,
) {
    let mut published = HashSet::with_capacity(results.len());

    for result in results {
        let id = result.job_id;
        match handles.remove(&id) {
            Some(handle) => {
                published.insert(id);
                resolve(shared, &handle, result);
            }
            None if published.contains(&id) => shared.log(
                LogLevel::Warning,
                &format!("Discarding duplicate result for job {id}"),
            ),
            None => shared.log(
                LogLevel::Warning,
                &format!("Discarding result for job {id}, which was not part of the batch"),
            ),
        }
    }

    let missing: Vec<JobId> = order
        .iter()
        .copied()
        .filter(|id| handles.contains_key(id))
        .collect();
    if missing.is_empty() {
        return;
    }

    shared.log(
        LogLevel::Error,
        &format!(
            "Processor returned no result for job(s) {}",
            describe_ids(&missing)
        ),
    );
    for id in missing {
        if let Some(handle) = handles.remove(&id) {
            resolve(
                shared,
                &handle,
                JobResult::error(id, format!("processor returned no result for job {id}")),
            );
        }
    }
}

fn resolve<P: BatchProcessor>(shared: &Shared<P>, handle: &PendingResult, result: JobResult) {
    if let Err(e) = handle.resolve(Ok(result)) {
        shared.log(LogLevel::Error, &e.to_string());
    }
}

fn panic_detail(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn describe_ids(ids: &[JobId]) -> String {
    ids.iter().map(JobId::to_string).collect::<Vec<_>>().join(", ")
}
