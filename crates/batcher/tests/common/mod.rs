#![allow(dead_code)]

use std::future::IntoFuture;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use microbatch_batcher::{JobOutcome, MicroBatcher, PendingResult};
use microbatch_core::{
    BatchProcessor, BatcherOptions, Job, JobId, JobResult, LogLevel, Logger, ProcessorError,
};

/// Succeeds every job and remembers each batch it was given.
#[derive(Clone, Default)]
pub struct Recorder {
    batches: Arc<Mutex<Vec<Vec<Job>>>>,
    delay: Duration,
}

impl Recorder {
    /// Recorder that blocks for `delay` on every call.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    pub fn batches(&self) -> Vec<Vec<Job>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches().iter().map(Vec::len).collect()
    }

    pub fn batch_ids(&self) -> Vec<Vec<JobId>> {
        self.batches()
            .iter()
            .map(|batch| batch.iter().map(Job::id).collect())
            .collect()
    }

    pub fn seen_ids(&self) -> Vec<JobId> {
        self.batches()
            .into_iter()
            .flatten()
            .map(|job| job.id())
            .collect()
    }
}

impl BatchProcessor for Recorder {
    fn process(&self, jobs: Vec<Job>) -> Result<Vec<JobResult>, ProcessorError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let results = jobs
            .iter()
            .map(|job| JobResult::success(job.id(), job.content()))
            .collect();
        self.batches.lock().unwrap().push(jobs);
        Ok(results)
    }
}

/// Captures every diagnostic.
#[derive(Clone, Default)]
pub struct Captured {
    entries: Arc<Mutex<Vec<(LogLevel, String)>>>,
}

impl Captured {
    pub fn count(&self, level: LogLevel, needle: &str) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, m)| *l == level && m.contains(needle))
            .count()
    }
}

impl Logger for Captured {
    fn log(&self, level: LogLevel, message: &str) {
        self.entries.lock().unwrap().push((level, message.to_string()));
    }
}

pub fn fast_options(batch_size: usize) -> BatcherOptions {
    BatcherOptions::new(Duration::from_millis(20), batch_size, None)
}

pub fn started<P: BatchProcessor>(
    processor: P,
    logger: Captured,
    options: BatcherOptions,
) -> MicroBatcher<P> {
    let batcher = MicroBatcher::new(processor, logger, options);
    batcher.start_processing().expect("inside a tokio runtime");
    batcher
}

pub fn submit<P: BatchProcessor>(
    batcher: &MicroBatcher<P>,
    ids: impl IntoIterator<Item = i64>,
) -> Vec<PendingResult> {
    ids.into_iter()
        .map(|i| batcher.add_job(Job::new(i, format!("test - {i}"))))
        .collect()
}

/// Await every handle, failing the test instead of hanging.
pub async fn collect(handles: Vec<PendingResult>) -> Vec<JobOutcome> {
    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        let outcome = tokio::time::timeout(Duration::from_secs(15), handle.into_future())
            .await
            .expect("job result never resolved");
        outcomes.push(outcome);
    }
    outcomes
}

pub async fn collect_ok(handles: Vec<PendingResult>) -> Vec<JobResult> {
    collect(handles)
        .await
        .into_iter()
        .map(|o| o.expect("job failed with a batch error"))
        .collect()
}

pub fn successes(results: &[JobResult]) -> usize {
    results.iter().filter(|r| r.is_success()).count()
}
