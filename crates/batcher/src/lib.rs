//! `microbatch-batcher`
//!
//! **Responsibility:** accumulate individually submitted jobs into bounded
//! batches and hand each batch to a caller-supplied processor.
//!
//! ## Components
//!
//! - `JobQueue`: FIFO of admitted jobs awaiting a batch
//! - `PendingResultTable` / `PendingResult`: one single-assignment handle per job id
//! - `scheduler`: the flush loop (wake, debounce, drain, process, publish)
//! - `MicroBatcher`: admission, options, shutdown and lifecycle
//!
//! Queue, result table and shutdown flag share one lock, so admission
//! (including the capacity check) is atomic with respect to draining.

pub mod logger;
pub mod pending;
pub mod queue;
pub mod scheduler;
pub mod service;

pub use logger::TracingLogger;
pub use pending::{JobOutcome, PendingResult, PendingResultTable};
pub use queue::JobQueue;
pub use scheduler::SchedulerState;
pub use service::MicroBatcher;
