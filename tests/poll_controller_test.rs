//! Poll Controller Tests
//!
//! Drives the controller cycle by cycle against in-memory collaborators and a
//! real checkpoint file.

mod common;

use common::*;
use std::time::Duration;
use zm_log_shipper::{CycleOutcome, PipelineState, ShipperError};

#[tokio::test]
async fn test_distinct_labels_ship_as_separate_streams() {
    let mut harness = Harness::new(distinct_records(101..=103), Some(100));

    assert_eq!(harness.controller.start().unwrap(), PipelineState::Polling);
    let outcome = harness.controller.run_cycle().await.unwrap();

    assert_eq!(
        outcome,
        CycleOutcome::Shipped {
            records: 3,
            streams: 3,
            checkpoint: 103,
            saturated: false,
        }
    );
    let accepted = harness.sink.accepted();
    assert_eq!(accepted.len(), 1, "one payload per batch");
    assert_eq!(accepted[0].len(), 3);
    assert_eq!(harness.controller.checkpoint(), Some(103));
    assert_eq!(harness.persisted_checkpoint(), Some(103));
}

#[tokio::test]
async fn test_shared_labels_merge_into_one_ordered_stream() {
    let mut harness = Harness::new(same_stream_records([101, 102]), Some(100));

    harness.controller.run_cycle().await.unwrap();

    let accepted = harness.sink.accepted();
    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].len(), 1);
    let lines: Vec<_> = accepted[0][0].entries.iter().map(|e| e.line.as_str()).collect();
    assert_eq!(lines, vec!["message 101", "message 102"]);
    assert_eq!(harness.persisted_checkpoint(), Some(102));
}

#[tokio::test]
async fn test_failed_ship_leaves_checkpoint_and_retries_same_batch() {
    let mut harness = Harness::new(distinct_records(101..=103), Some(100));
    harness.sink.fail_next(1);

    let err = harness.controller.run_cycle().await.unwrap_err();
    assert!(matches!(err, ShipperError::Sink(_)));
    assert!(!err.is_fatal());
    assert_eq!(harness.controller.checkpoint(), Some(100));
    assert_eq!(harness.persisted_checkpoint(), Some(100));
    assert!(harness.sink.accepted().is_empty());

    harness.controller.run_cycle().await.unwrap();

    let attempts = harness.sink.attempts();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0], attempts[1], "retry must offer the identical payload");
    assert_eq!(harness.source.fetch_after_calls(), vec![100, 100]);
    assert_eq!(harness.persisted_checkpoint(), Some(103));
}

#[tokio::test]
async fn test_empty_batch_skips_sink() {
    let mut harness = Harness::new(distinct_records(90..=100), Some(100));

    let outcome = harness.controller.run_cycle().await.unwrap();

    assert_eq!(outcome, CycleOutcome::Idle);
    assert!(outcome.should_sleep());
    assert!(harness.sink.attempts().is_empty());
    assert_eq!(harness.persisted_checkpoint(), Some(100));
}

#[tokio::test]
async fn test_source_error_does_not_touch_checkpoint() {
    let mut harness = Harness::new(distinct_records(101..=102), Some(100));
    harness.source.fail_next(1);

    let err = harness.controller.run_cycle().await.unwrap_err();
    assert!(matches!(err, ShipperError::Source(_)));
    assert!(!err.is_fatal());
    assert_eq!(harness.persisted_checkpoint(), Some(100));
    assert!(harness.sink.attempts().is_empty());

    harness.controller.run_cycle().await.unwrap();
    assert_eq!(harness.persisted_checkpoint(), Some(102));
}

#[tokio::test]
async fn test_checkpoint_is_monotonic_across_cycles() {
    let mut harness = Harness::with_config(distinct_records(1..=5), Some(0), |config| {
        config.batch_size = 2;
    });

    let mut seen = vec![harness.persisted_checkpoint().unwrap()];
    loop {
        let outcome = harness.controller.run_cycle().await.unwrap();
        seen.push(harness.persisted_checkpoint().unwrap());
        if outcome == CycleOutcome::Idle {
            break;
        }
    }

    assert_eq!(seen, vec![0, 2, 4, 5, 5]);
    assert_eq!(
        harness.sink.delivered_messages(),
        (1..=5).map(|id| format!("message {id}")).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_full_batch_is_saturated() {
    let mut harness = Harness::with_config(distinct_records(101..=104), Some(100), |config| {
        config.batch_size = 2;
    });

    let outcome = harness.controller.run_cycle().await.unwrap();
    assert!(matches!(
        outcome,
        CycleOutcome::Shipped {
            checkpoint: 102,
            saturated: true,
            ..
        }
    ));
    assert!(!outcome.should_sleep());
}

#[tokio::test]
async fn test_rows_written_after_startup_are_picked_up() {
    let mut harness = Harness::new(distinct_records(101..=101), Some(100));

    harness.controller.run_cycle().await.unwrap();
    assert_eq!(harness.controller.run_cycle().await.unwrap(), CycleOutcome::Idle);

    harness.source.insert(distinct_records(102..=103));
    harness.controller.run_cycle().await.unwrap();

    assert_eq!(harness.source.fetch_after_calls(), vec![100, 101, 101]);
    assert_eq!(harness.persisted_checkpoint(), Some(103));
}

#[tokio::test]
async fn test_startup_rewrites_existing_checkpoint() {
    let mut harness = Harness::new(vec![], Some(100));
    std::fs::write(&harness.checkpoint_path, "100\n").unwrap();

    harness.controller.start().unwrap();

    assert_eq!(
        std::fs::read_to_string(&harness.checkpoint_path).unwrap(),
        "100",
        "self-test must rewrite the value in canonical form"
    );
}

#[tokio::test]
async fn test_unwritable_checkpoint_fails_at_startup() {
    let mut harness = Harness::new(distinct_records(101..=101), Some(100));
    // A directory where the temporary sibling goes makes every write fail,
    // whatever the privileges of the test process.
    let mut temp = harness.checkpoint_path.clone().into_os_string();
    temp.push(".tmp");
    std::fs::create_dir(&temp).unwrap();

    let err = harness.controller.start().unwrap_err();

    assert!(matches!(err, ShipperError::Checkpoint(_)));
    assert!(err.is_fatal());
    assert_eq!(harness.controller.state(), PipelineState::Uninitialized);
    assert!(harness.source.fetch_after_calls().is_empty());
}

#[tokio::test]
async fn test_corrupt_checkpoint_is_fatal() {
    let mut harness = Harness::new(distinct_records(101..=101), None);
    std::fs::write(&harness.checkpoint_path, "not-a-number").unwrap();

    let err = harness.controller.run(std::future::pending()).await.unwrap_err();

    assert!(matches!(err, ShipperError::Checkpoint(_)));
    assert!(harness.sink.attempts().is_empty());
    assert_eq!(harness.source.max_id_calls(), 0, "must not fall back to backfill");
}

#[tokio::test]
async fn test_run_ships_until_shutdown() {
    let mut harness = Harness::new(distinct_records(101..=103), Some(100));
    harness.sink.fail_next(2);

    harness
        .controller
        .run(tokio::time::sleep(Duration::from_millis(200)))
        .await
        .unwrap();

    assert_eq!(harness.sink.attempts().len(), 3, "two rejected pushes then success");
    assert_eq!(harness.sink.accepted().len(), 1);
    assert_eq!(harness.persisted_checkpoint(), Some(103));
}

#[tokio::test]
async fn test_run_stops_on_checkpoint_write_failure() {
    let mut harness = Harness::new(distinct_records(101..=103), None);
    let mut temp = harness.checkpoint_path.clone().into_os_string();
    temp.push(".tmp");
    std::fs::create_dir(&temp).unwrap();

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        harness.controller.run(std::future::pending()),
    )
    .await
    .expect("fatal error must end the loop");

    assert!(matches!(result, Err(ShipperError::Checkpoint(_))));
    assert_eq!(
        harness.sink.accepted().len(),
        1,
        "the batch was delivered but could not be checkpointed"
    );
    assert_eq!(harness.persisted_checkpoint(), None);
}

#[tokio::test]
async fn test_shutdown_interrupts_stalled_query() {
    let mut harness = Harness::new(distinct_records(101..=103), Some(100));
    harness.source.stall_next(1);

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        harness
            .controller
            .run(tokio::time::sleep(Duration::from_millis(100))),
    )
    .await
    .expect("shutdown must not wait for the stalled query");

    assert!(result.is_ok());
    assert_eq!(harness.source.fetch_after_calls(), Vec::<u64>::new());
    assert!(harness.sink.attempts().is_empty());
    assert_eq!(harness.persisted_checkpoint(), Some(100));
}

#[tokio::test]
async fn test_query_timeout_is_retried_next_cycle() {
    let mut harness = Harness::new(distinct_records(101..=102), Some(100));
    harness.source.time_out_next(1);

    let err = harness.controller.run_cycle().await.unwrap_err();
    assert!(matches!(
        err,
        ShipperError::Source(zm_log_shipper::SourceError::Timeout { .. })
    ));
    assert!(!err.is_fatal());
    assert_eq!(harness.persisted_checkpoint(), Some(100));

    harness.controller.run_cycle().await.unwrap();
    assert_eq!(harness.persisted_checkpoint(), Some(102));
}
