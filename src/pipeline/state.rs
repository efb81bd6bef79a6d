use std::fmt;

/// Lifecycle of the poll controller.
///
/// `Uninitialized -> Backfilling -> Polling`, or straight from
/// `Uninitialized` to `Polling` when a checkpoint exists. Backfilling is
/// entered at most once per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Uninitialized,
    Backfilling,
    Polling,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Uninitialized => write!(f, "uninitialized"),
            PipelineState::Backfilling => write!(f, "backfilling"),
            PipelineState::Polling => write!(f, "polling"),
        }
    }
}

/// Position of an in-flight backfill pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillProgress {
    /// Rows with `time_key` at or after this Unix second are shipped
    pub threshold: i64,
    /// Max id observed before the windowed fetch started
    pub seed: u64,
    /// Last id shipped by this pass; pages resume after it
    pub cursor: u64,
    /// Rows shipped so far
    pub shipped: usize,
}

/// Result of one controller cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No new rows
    Idle,
    /// A batch was shipped and the checkpoint advanced
    Shipped {
        records: usize,
        streams: usize,
        checkpoint: u64,
        /// The batch was full, so more rows are probably waiting
        saturated: bool,
    },
    /// The backfill pass ran out of rows and polling takes over
    BackfillComplete { checkpoint: u64, shipped: usize },
}

impl CycleOutcome {
    /// Whether the loop should wait a poll interval before the next cycle
    pub fn should_sleep(&self) -> bool {
        match self {
            CycleOutcome::Idle => true,
            CycleOutcome::Shipped { saturated, .. } => !saturated,
            CycleOutcome::BackfillComplete { .. } => false,
        }
    }
}
