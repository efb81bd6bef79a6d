//! Shared fixtures for the integration suites

#![allow(dead_code)]

pub mod builders;
pub mod mocks;

#[allow(unused_imports)]
pub use builders::*;
#[allow(unused_imports)]
pub use mocks::*;

use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

use zm_log_shipper::config::PipelineConfig;
use zm_log_shipper::{CommonLabels, FileCheckpointStore, PollController, StreamGrouper};

/// Fixed "now" for backfill tests: one hour after [`BASE_TIME`]
pub const NOW: i64 = 1_703_578_239;

pub type TestController = PollController<MockRowSource, MockSink, FileCheckpointStore>;

/// A controller wired to mocks and a checkpoint file in a temporary directory
pub struct Harness {
    pub controller: TestController,
    pub source: MockRowSource,
    pub sink: MockSink,
    pub checkpoint_path: PathBuf,
    _dir: TempDir,
}

impl Harness {
    pub fn new(rows: Vec<zm_log_shipper::LogRecord>, checkpoint: Option<u64>) -> Self {
        Self::with_config(rows, checkpoint, |_| {})
    }

    pub fn with_config(
        rows: Vec<zm_log_shipper::LogRecord>,
        checkpoint: Option<u64>,
        configure: impl FnOnce(&mut PipelineConfig),
    ) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let checkpoint_path = dir.path().join("pointer.txt");
        if let Some(position) = checkpoint {
            std::fs::write(&checkpoint_path, position.to_string())
                .expect("Failed to seed checkpoint file");
        }

        let mut config = PipelineConfig {
            poll_interval: Duration::from_millis(10),
            backfill_window: Duration::from_secs(60 * 60),
            checkpoint_path: checkpoint_path.clone(),
            batch_size: 1000,
        };
        configure(&mut config);

        let source = MockRowSource::new(rows);
        let sink = MockSink::new();
        let controller = PollController::new(
            source.clone(),
            sink.clone(),
            FileCheckpointStore::new(&checkpoint_path),
            StreamGrouper::new(CommonLabels::new("nvr01", "zoneminder")),
            config,
        )
        .with_clock(|| NOW);

        Self {
            controller,
            source,
            sink,
            checkpoint_path,
            _dir: dir,
        }
    }

    /// Value currently in the checkpoint file, `None` if it does not exist
    pub fn persisted_checkpoint(&self) -> Option<u64> {
        std::fs::read_to_string(&self.checkpoint_path)
            .ok()
            .map(|s| s.trim().parse().expect("checkpoint file must hold an integer"))
    }
}
