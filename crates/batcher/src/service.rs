//! Service surface: admission, options, lifecycle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tokio::sync::{Notify, watch};

use microbatch_core::{
    BatchError, BatchProcessor, BatcherOptions, Job, JobId, JobResult, LogLevel, Logger,
};

use crate::logger::TracingLogger;
use crate::pending::{PendingResult, PendingResultTable};
use crate::queue::JobQueue;
use crate::scheduler::{self, Batch, SchedulerState};

/// Everything admission and the flush loop must agree on, behind one lock.
#[derive(Debug, Default)]
pub(crate) struct BatchState {
    pub(crate) queue: JobQueue,
    pub(crate) pending: PendingResultTable,
    pub(crate) shutdown: bool,
}

pub(crate) struct Shared<P> {
    pub(crate) processor: Arc<P>,
    logger: Arc<dyn Logger>,
    options: RwLock<BatcherOptions>,
    state: Mutex<BatchState>,
    /// Wake-on-enqueue; a stored permit coalesces bursts into one wake.
    pub(crate) wake: Notify,
    lifecycle: watch::Sender<SchedulerState>,
}

impl<P: BatchProcessor> Shared<P> {
    fn lock_state(&self) -> MutexGuard<'_, BatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn log(&self, level: LogLevel, message: &str) {
        self.logger.log(level, message);
    }

    pub(crate) fn options(&self) -> BatcherOptions {
        self.options
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Queue length and shutdown flag, read together.
    pub(crate) fn queue_snapshot(&self) -> (usize, bool) {
        let state = self.lock_state();
        (state.queue.len(), state.shutdown)
    }

    /// Cut up to `max` jobs from the head of the queue, with their handles.
    pub(crate) fn take_batch(&self, max: usize) -> Batch {
        let mut state = self.lock_state();
        let jobs = state.queue.drain_batch(max);
        let handles = jobs
            .iter()
            .filter_map(|job| {
                state
                    .pending
                    .get(job.id())
                    .map(|handle| (job.id(), handle.clone()))
            })
            .collect();
        Batch { jobs, handles }
    }

    pub(crate) fn set_state(&self, next: SchedulerState) {
        self.lifecycle.send_replace(next);
    }

    /// Move `from → to` only if the loop is currently in `from`.
    pub(crate) fn transition(&self, from: SchedulerState, to: SchedulerState) -> bool {
        self.lifecycle.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        })
    }
}

/// Outcome of an admission decision, logged after the state lock is released.
enum Admission {
    Admitted(PendingResult),
    Duplicate(PendingResult),
    ShuttingDown,
    QueueFull,
}

/// Micro-batching service.
///
/// Jobs submitted through [`add_job`](MicroBatcher::add_job) are queued and
/// handed to the processor in groups of at most `batch_size`, one batch per
/// `frequency` window. Each submitter gets a [`PendingResult`] that resolves
/// once its job's result is known.
///
/// Clones share the same queue, results and loop.
pub struct MicroBatcher<P: BatchProcessor> {
    shared: Arc<Shared<P>>,
}

impl<P: BatchProcessor> Clone for MicroBatcher<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P: BatchProcessor> MicroBatcher<P> {
    pub fn new(processor: P, logger: impl Logger, options: BatcherOptions) -> Self {
        let (lifecycle, _) = watch::channel(SchedulerState::NotStarted);
        Self {
            shared: Arc::new(Shared {
                processor: Arc::new(processor),
                logger: Arc::new(logger),
                options: RwLock::new(options),
                state: Mutex::new(BatchState::default()),
                wake: Notify::new(),
                lifecycle,
            }),
        }
    }

    /// Batcher that reports through `tracing`.
    pub fn with_tracing(processor: P, options: BatcherOptions) -> Self {
        Self::new(processor, TracingLogger, options)
    }

    /// Submit a job. Never blocks on batch execution.
    ///
    /// - `None` resolves to [`BatchError::InvalidArgument`].
    /// - After [`shutdown`](Self::shutdown) the handle is already resolved with an error result.
    /// - A known id returns the existing handle; the new content is discarded.
    /// - A full queue resolves immediately with an error result.
    pub fn add_job(&self, job: impl Into<Option<Job>>) -> PendingResult {
        let Some(job) = job.into() else {
            self.shared.log(LogLevel::Error, "No job provided");
            return PendingResult::ready(
                None,
                Err(BatchError::invalid_argument("no job provided")),
            );
        };

        let id = job.id();
        let max_queue_size = self.options().max_queue_size;

        let admission = {
            let mut state = self.shared.lock_state();
            if state.shutdown {
                Admission::ShuttingDown
            } else if let Some(existing) = state.pending.get(id) {
                Admission::Duplicate(existing.clone())
            } else if max_queue_size.is_some_and(|max| state.queue.len() >= max) {
                Admission::QueueFull
            } else {
                let handle = state.pending.register(id);
                state.queue.push(job);
                Admission::Admitted(handle)
            }
        };

        match admission {
            Admission::Admitted(handle) => {
                self.shared.wake.notify_one();
                handle
            }
            Admission::Duplicate(handle) => {
                self.shared.log(
                    LogLevel::Warning,
                    &format!("Job {id} has already been added"),
                );
                handle
            }
            Admission::ShuttingDown => self.reject(
                id,
                format!("Job {id} cannot be processed as the service has shut down."),
            ),
            Admission::QueueFull => self.reject(
                id,
                format!("Job {id} cannot be added as the queue is full."),
            ),
        }
    }

    fn reject(&self, id: JobId, details: String) -> PendingResult {
        self.shared.log(LogLevel::Error, &details);
        PendingResult::ready(Some(id), Ok(JobResult::error(id, details)))
    }

    /// Replace every option. Takes effect from the next flush cycle.
    pub fn update_options(&self, options: BatcherOptions) {
        *self
            .shared
            .options
            .write()
            .unwrap_or_else(PoisonError::into_inner) = options;
        self.shared.wake.notify_one();
    }

    pub fn options(&self) -> BatcherOptions {
        self.shared.options()
    }

    /// Start the flush loop on the current tokio runtime.
    ///
    /// Starting a loop that is already running (or has stopped) logs an
    /// error and does nothing.
    pub fn start_processing(&self) -> Result<(), BatchError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| BatchError::NoRuntime)?;

        if !self
            .shared
            .transition(SchedulerState::NotStarted, SchedulerState::Running)
        {
            let message = match self.state() {
                SchedulerState::Stopped => "MicroBatcher has stopped and cannot be restarted.",
                _ => "MicroBatcher is already running.",
            };
            self.shared.log(LogLevel::Error, message);
            return Ok(());
        }

        runtime.spawn(scheduler::run(Arc::clone(&self.shared)));
        Ok(())
    }

    /// Stop admitting jobs; already queued jobs still drain. Idempotent.
    pub fn shutdown(&self) {
        self.shared.lock_state().shutdown = true;
        self.shared.log(LogLevel::Debug, "Shutting down");
        self.shared.wake.notify_one();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.lock_state().shutdown
    }

    pub fn is_processing(&self) -> bool {
        self.state().is_processing()
    }

    pub fn state(&self) -> SchedulerState {
        *self.shared.lifecycle.borrow()
    }

    /// Resolves once the flush loop has exited, or immediately if it never started.
    pub async fn wait_stopped(&self) {
        let mut rx = self.shared.lifecycle.subscribe();
        let _ = rx
            .wait_for(|s| matches!(s, SchedulerState::NotStarted | SchedulerState::Stopped))
            .await;
    }

    /// Jobs admitted but not yet cut into a batch.
    pub fn queue_len(&self) -> usize {
        self.shared.lock_state().queue.len()
    }

    /// Distinct job ids ever admitted. Never shrinks.
    pub fn pending_len(&self) -> usize {
        self.shared.lock_state().pending.len()
    }
}
