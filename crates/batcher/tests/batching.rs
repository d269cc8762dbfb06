mod common;

use std::collections::HashSet;
use std::time::{Duration, Instant};

use proptest::prelude::*;

use microbatch_batcher::{MicroBatcher, SchedulerState};
use microbatch_core::{BatchError, BatcherOptions, Job, JobId, LogLevel, NoopLogger};

use common::{Captured, Recorder, collect, collect_ok, fast_options, started, submit, successes};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn twenty_jobs_at_one_second_run_as_four_debounced_batches() {
    let recorder = Recorder::default();
    let batcher = started(
        recorder.clone(),
        Captured::default(),
        BatcherOptions::new(Duration::from_millis(1000), 5, None),
    );

    let started_at = Instant::now();
    let results = collect_ok(submit(&batcher, 1..=20)).await;
    let elapsed = started_at.elapsed();

    assert_eq!(recorder.calls(), 4);
    assert_eq!(recorder.batch_sizes(), vec![5, 5, 5, 5]);
    assert_eq!(successes(&results), 20);
    assert!(
        elapsed >= Duration::from_millis(4000) && elapsed < Duration::from_millis(6000),
        "took {elapsed:?}"
    );
}

#[tokio::test]
async fn batches_cover_every_job_exactly_once_in_arrival_order() {
    let recorder = Recorder::default();
    let batcher = started(recorder.clone(), Captured::default(), fast_options(3));

    let results = collect_ok(submit(&batcher, 1..=10)).await;

    assert_eq!(recorder.calls(), 4);
    assert_eq!(recorder.batch_sizes(), vec![3, 3, 3, 1]);
    assert_eq!(
        recorder.seen_ids(),
        (1..=10).map(JobId).collect::<Vec<_>>()
    );
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.job_id, JobId(i as i64 + 1));
        assert_eq!(result.details.as_deref(), Some(format!("test - {}", i + 1).as_str()));
    }
}

#[tokio::test]
async fn updated_options_apply_on_the_next_cycle() {
    let recorder = Recorder::default();
    let batcher = started(
        recorder.clone(),
        Captured::default(),
        BatcherOptions::new(Duration::from_secs(60), 5, None),
    );

    // The loop is idle, so the slow frequency has not been read yet.
    batcher.update_options(BatcherOptions::new(Duration::from_millis(20), 10, None));
    let results = collect_ok(submit(&batcher, 1..=20)).await;

    assert_eq!(recorder.batch_sizes(), vec![10, 10]);
    assert_eq!(successes(&results), 20);
}

#[tokio::test]
async fn jobs_arriving_mid_batch_wait_for_the_next_cut() {
    let recorder = Recorder::slow(Duration::from_millis(200));
    let batcher = started(recorder.clone(), Captured::default(), fast_options(5));

    let mut handles = submit(&batcher, 1..=2);
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(recorder.calls(), 0, "first batch should still be running");
    assert_eq!(batcher.queue_len(), 0);

    handles.extend(submit(&batcher, 3..=4));
    assert_eq!(batcher.queue_len(), 2);
    assert!(handles[2..].iter().all(|h| !h.is_resolved()));

    let results = collect_ok(handles).await;

    assert_eq!(successes(&results), 4);
    assert_eq!(
        recorder.batch_ids(),
        vec![vec![JobId(1), JobId(2)], vec![JobId(3), JobId(4)]]
    );
}

#[tokio::test]
async fn zero_batch_size_parks_the_loop_until_options_change() {
    let recorder = Recorder::default();
    let batcher = started(
        recorder.clone(),
        Captured::default(),
        BatcherOptions::new(Duration::ZERO, 0, None),
    );

    let handles = submit(&batcher, 1..=3);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(recorder.calls(), 0);
    assert_eq!(batcher.queue_len(), 3);
    assert!(batcher.is_processing());

    batcher.update_options(BatcherOptions::new(Duration::ZERO, 3, None));
    let results = collect_ok(handles).await;

    assert_eq!(successes(&results), 3);
    assert_eq!(recorder.batch_sizes(), vec![3]);
}

#[tokio::test]
async fn queue_cap_rejects_overflow_before_any_flush() {
    let recorder = Recorder::default();
    let batcher = started(
        recorder.clone(),
        Captured::default(),
        BatcherOptions::new(Duration::from_millis(50), 10, Some(3)),
    );

    let results = collect_ok(submit(&batcher, 1..=20)).await;

    assert_eq!(recorder.calls(), 1);
    assert_eq!(successes(&results), 3);
    let rejected: Vec<_> = results.iter().filter(|r| !r.is_success()).collect();
    assert_eq!(rejected.len(), 17);
    assert!(
        rejected
            .iter()
            .all(|r| r.details.as_deref().unwrap_or_default().contains("queue is full"))
    );
}

#[test]
fn concurrent_submitters_never_overfill_the_queue() {
    let batcher = MicroBatcher::new(
        Recorder::default(),
        NoopLogger,
        BatcherOptions::default().with_max_queue_size(Some(25)),
    );

    let handles: Vec<_> = (0..8i64)
        .map(|t| {
            let batcher = batcher.clone();
            std::thread::spawn(move || {
                (0..50i64)
                    .map(|i| batcher.add_job(Job::new(t * 1000 + i, "x")))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let pending: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    let admitted = pending.iter().filter(|p| !p.is_resolved()).count();
    assert_eq!(admitted, 25);
    assert_eq!(batcher.queue_len(), 25);
}

#[tokio::test]
async fn duplicate_submission_returns_the_same_handle() {
    let recorder = Recorder::default();
    let log = Captured::default();
    let batcher = started(recorder.clone(), log.clone(), fast_options(5));

    let first = batcher.add_job(Job::new(1, "original"));
    let second = batcher.add_job(Job::new(1, "duplicate"));
    assert!(first.same_as(&second));

    let results = collect_ok(vec![first, second]).await;

    assert_eq!(results[0], results[1]);
    assert_eq!(results[0].details.as_deref(), Some("original"));
    assert_eq!(recorder.seen_ids(), vec![JobId(1)]);
    assert!(
        recorder
            .batches()
            .iter()
            .flatten()
            .all(|job| job.content() != "duplicate")
    );
    assert_eq!(log.count(LogLevel::Warning, "already been added"), 1);
}

#[tokio::test]
async fn resubmitting_a_finished_id_returns_its_result() {
    let recorder = Recorder::default();
    let batcher = started(recorder.clone(), Captured::default(), fast_options(5));

    let first = collect_ok(submit(&batcher, [7])).await;
    let again = collect_ok(submit(&batcher, [7])).await;

    assert_eq!(first, again);
    assert_eq!(recorder.calls(), 1);
    assert_eq!(batcher.pending_len(), 1);
}

#[tokio::test]
async fn absent_job_never_reaches_the_processor() {
    let recorder = Recorder::default();
    let log = Captured::default();
    let batcher = started(recorder.clone(), log.clone(), fast_options(5));

    let outcome = collect(vec![batcher.add_job(None)]).await.remove(0);

    assert!(matches!(outcome, Err(BatchError::InvalidArgument(_))));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(recorder.calls(), 0);
    assert_eq!(batcher.queue_len(), 0);
    assert_eq!(log.count(LogLevel::Error, "No job provided"), 1);
}

#[tokio::test]
async fn idle_loop_never_invokes_the_processor() {
    let recorder = Recorder::default();
    let log = Captured::default();
    let batcher = started(recorder.clone(), log.clone(), fast_options(5));

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(recorder.calls(), 0);
    assert!(batcher.is_processing());
    assert_eq!(log.count(LogLevel::Debug, "Started processing."), 1);
    assert_eq!(log.count(LogLevel::Debug, "Processing batch"), 0);
}

#[tokio::test]
async fn starting_twice_logs_and_keeps_one_loop() {
    let recorder = Recorder::default();
    let log = Captured::default();
    let batcher = started(recorder.clone(), log.clone(), fast_options(5));

    batcher.start_processing().unwrap();
    batcher.clone().start_processing().unwrap();

    let results = collect_ok(submit(&batcher, 1..=5)).await;

    assert_eq!(successes(&results), 5);
    assert_eq!(recorder.calls(), 1);
    assert_eq!(batcher.state(), SchedulerState::Running);
    assert_eq!(log.count(LogLevel::Error, "already running"), 2);
    assert_eq!(log.count(LogLevel::Debug, "Started processing."), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn batch_count_is_ceil_of_jobs_over_batch_size(n in 1i64..40, batch in 1usize..8) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();

        let recorder = Recorder::default();
        let results = runtime.block_on(async {
            let batcher = MicroBatcher::new(
                recorder.clone(),
                NoopLogger,
                BatcherOptions::new(Duration::ZERO, batch, None),
            );
            // Queue everything first so each cut is a full batch.
            let handles = submit(&batcher, 0..n);
            batcher.start_processing().unwrap();
            collect_ok(handles).await
        });

        prop_assert_eq!(recorder.calls(), (n as usize).div_ceil(batch));
        prop_assert!(recorder.batch_sizes().iter().all(|&s| s <= batch));

        let seen: HashSet<_> = recorder.seen_ids().into_iter().collect();
        prop_assert_eq!(seen.len(), n as usize);
        prop_assert_eq!(recorder.seen_ids().len(), n as usize);
        prop_assert_eq!(successes(&results), n as usize);
    }
}
