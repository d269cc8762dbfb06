//! `microbatch-core` — value records and collaborator seams for the micro-batcher.
//!
//! This crate holds no concurrency: jobs, results, options, errors, and the
//! two traits a host implements (`BatchProcessor`, `Logger`).

pub mod error;
pub mod job;
pub mod logger;
pub mod options;
pub mod processor;

pub use error::{AlreadyResolved, BatchError, ProcessorError};
pub use job::{Job, JobId, JobResult, JobStatus};
pub use logger::{LogLevel, Logger, NoopLogger};
pub use options::BatcherOptions;
pub use processor::BatchProcessor;
