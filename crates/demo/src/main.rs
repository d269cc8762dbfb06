//! Demo host: submits twenty jobs to a micro-batcher and prints the results.
//!
//! Options come from `MICROBATCH_*` environment variables (see
//! `BatcherOptions::from_env`); logging follows `RUST_LOG` and
//! `MICROBATCH_LOG_FORMAT`.

use std::thread;
use std::time::Duration;

use anyhow::Context;

use microbatch_batcher::MicroBatcher;
use microbatch_core::{BatcherOptions, Job, JobResult, ProcessorError};

const JOB_COUNT: i64 = 20;

/// Stands in for a downstream that prefers groups: one second per batch.
fn print_and_succeed(jobs: Vec<Job>) -> Result<Vec<JobResult>, ProcessorError> {
    thread::sleep(Duration::from_secs(1));
    Ok(jobs
        .into_iter()
        .map(|job| {
            tracing::info!(job_id = %job.id(), content = job.content(), "job processed");
            JobResult::success(job.id(), "Success")
        })
        .collect())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    microbatch_observability::init();

    let options = BatcherOptions::from_env();
    tracing::info!(
        frequency_ms = options.frequency.as_millis() as u64,
        batch_size = options.batch_size,
        max_queue_size = ?options.max_queue_size,
        "starting micro-batcher"
    );

    let batcher = MicroBatcher::with_tracing(print_and_succeed, options);
    batcher
        .start_processing()
        .context("failed to start batch scheduler")?;

    let pending: Vec<_> = (1..=JOB_COUNT)
        .map(|i| batcher.add_job(Job::new(i, format!("test - {i}"))))
        .collect();

    for handle in pending {
        let result = handle.await.context("job failed")?;
        println!("{}", serde_json::to_string(&result)?);
    }

    batcher.shutdown();
    batcher.wait_stopped().await;
    tracing::info!("micro-batcher stopped");

    Ok(())
}
