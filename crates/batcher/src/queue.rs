//! FIFO holding area for admitted jobs.

use std::collections::VecDeque;

use microbatch_core::Job;

/// Ordered queue of admitted jobs awaiting a batch.
///
/// Not synchronised on its own: it lives inside the batcher's shared state
/// and is only touched under that lock, so a drain is atomic with respect to
/// concurrent admissions.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: VecDeque<Job>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Append at the tail.
    pub fn push(&mut self, job: Job) {
        self.jobs.push_back(job);
    }

    /// Remove up to `max` jobs from the head, preserving admission order.
    pub fn drain_batch(&mut self, max: usize) -> Vec<Job> {
        let n = max.min(self.jobs.len());
        self.jobs.drain(..n).collect()
    }
}
