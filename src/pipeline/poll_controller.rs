//! # Poll Controller
//!
//! The checkpointed polling loop. One sequential worker drives every step:
//!
//! 1. **Startup**: read the checkpoint. If present, rewrite it as a
//!    write-permission self-test and start polling after it. If absent,
//!    run a one-time backfill.
//! 2. **Backfill**: note the table's current max id as a seed, then page
//!    through rows inside the backfill window, checkpointing each page like a
//!    poll batch. When the window is exhausted the checkpoint is raised to the
//!    seed if it is still below it, so an empty window still leaves a position.
//! 3. **Polling**: fetch rows after the checkpoint, group, ship, persist the
//!    batch's max id, sleep, repeat.
//!
//! The checkpoint is written only after the sink confirmed the batch, and the
//! in-memory value only moves after the write is durable. A failed ship leaves
//! both untouched, so the same rows are fetched again on the next cycle.

use chrono::Utc;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::state::{BackfillProgress, CycleOutcome, PipelineState};
use crate::checkpoint::CheckpointStore;
use crate::config::PipelineConfig;
use crate::database::RowSource;
use crate::error::Result;
use crate::grouping::StreamGrouper;
use crate::models::LogRecord;
use crate::sink::LogSink;

/// Source of "now" in Unix seconds
pub type Clock = fn() -> i64;

fn system_clock() -> i64 {
    Utc::now().timestamp()
}

pub struct PollController<S, K, C> {
    source: S,
    sink: K,
    checkpoint_store: C,
    grouper: StreamGrouper,
    config: PipelineConfig,
    clock: Clock,
    state: PipelineState,
    checkpoint: Option<u64>,
    backfill: Option<BackfillProgress>,
}

impl<S, K, C> PollController<S, K, C>
where
    S: RowSource,
    K: LogSink,
    C: CheckpointStore,
{
    pub fn new(
        source: S,
        sink: K,
        checkpoint_store: C,
        grouper: StreamGrouper,
        config: PipelineConfig,
    ) -> Self {
        Self {
            source,
            sink,
            checkpoint_store,
            grouper,
            config,
            clock: system_clock,
            state: PipelineState::Uninitialized,
            checkpoint: None,
            backfill: None,
        }
    }

    /// Replace the wall clock used for the backfill threshold
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Last durably persisted position, if any
    pub fn checkpoint(&self) -> Option<u64> {
        self.checkpoint
    }

    pub fn backfill_progress(&self) -> Option<&BackfillProgress> {
        self.backfill.as_ref()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Decide between resuming and backfilling.
    ///
    /// Only checkpoint errors can fail here, and they are all fatal.
    pub fn start(&mut self) -> Result<PipelineState> {
        if self.state != PipelineState::Uninitialized {
            return Ok(self.state);
        }

        match self.checkpoint_store.read()? {
            Some(position) => {
                self.checkpoint_store.verify_writable(position)?;
                self.checkpoint = Some(position);
                self.state = PipelineState::Polling;
                info!(checkpoint = position, "Polling for logs with id > {}", position);
            }
            None => {
                self.state = PipelineState::Backfilling;
                info!("No checkpoint found, starting backfill");
            }
        }

        Ok(self.state)
    }

    /// Run one cycle of whatever the current state calls for
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        if self.state == PipelineState::Uninitialized {
            self.start()?;
        }

        if self.state == PipelineState::Backfilling {
            self.backfill_cycle().await
        } else {
            self.poll_cycle().await
        }
    }

    /// Fetch, ship and checkpoint one batch after the current position
    async fn poll_cycle(&mut self) -> Result<CycleOutcome> {
        let after = self.checkpoint.unwrap_or(0);
        let batch = self
            .source
            .fetch_after(after, self.config.batch_size)
            .await?;

        if batch.is_empty() {
            debug!(checkpoint = after, "No new log rows");
            return Ok(CycleOutcome::Idle);
        }

        let (batch_max, streams) = self.ship_batch(&batch).await?;
        let checkpoint = self.advance_checkpoint(batch_max)?;

        info!(
            records = batch.len(),
            streams,
            checkpoint,
            "Shipped {} log messages",
            batch.len()
        );

        Ok(CycleOutcome::Shipped {
            records: batch.len(),
            streams,
            checkpoint,
            saturated: batch.len() >= self.config.batch_size as usize,
        })
    }

    /// Advance the backfill pass by one page
    async fn backfill_cycle(&mut self) -> Result<CycleOutcome> {
        let progress = match self.backfill {
            Some(progress) => progress,
            None => self.begin_backfill().await?,
        };

        let batch = self
            .source
            .fetch_since(progress.threshold, progress.cursor, self.config.batch_size)
            .await?;

        if batch.is_empty() {
            let checkpoint = self.advance_checkpoint(progress.seed)?;
            self.state = PipelineState::Polling;
            self.backfill = None;
            info!(
                checkpoint,
                shipped = progress.shipped,
                "Done backfilling {} older log messages",
                progress.shipped
            );
            return Ok(CycleOutcome::BackfillComplete {
                checkpoint,
                shipped: progress.shipped,
            });
        }

        let (batch_max, streams) = self.ship_batch(&batch).await?;
        let checkpoint = self.advance_checkpoint(batch_max)?;
        self.backfill = Some(BackfillProgress {
            cursor: batch_max,
            shipped: progress.shipped + batch.len(),
            ..progress
        });

        info!(
            records = batch.len(),
            streams,
            checkpoint,
            "Backfilled {} log messages",
            batch.len()
        );

        // Keep paging until the window is exhausted.
        Ok(CycleOutcome::Shipped {
            records: batch.len(),
            streams,
            checkpoint,
            saturated: true,
        })
    }

    async fn begin_backfill(&mut self) -> Result<BackfillProgress> {
        let seed = self.source.max_id().await?.unwrap_or(0);
        let oldest = self.source.min_id().await?;
        debug!(oldest, newest = seed, "Log table id range");
        let window = self.config.backfill_window.as_secs();
        let threshold = (self.clock)().saturating_sub(i64::try_from(window).unwrap_or(i64::MAX));

        info!(seed, "Set initial fallback checkpoint to {}", seed);
        info!(
            threshold,
            "Backfilling logs since {} (last {} minutes)",
            threshold,
            window / 60
        );

        let progress = BackfillProgress {
            threshold,
            seed,
            cursor: 0,
            shipped: 0,
        };
        self.backfill = Some(progress);
        Ok(progress)
    }

    /// Group and ship a non-empty batch; returns its max id and stream count
    async fn ship_batch(&self, batch: &[LogRecord]) -> Result<(u64, usize)> {
        let batch_max = batch.iter().map(|r| r.id).max().unwrap_or_default();
        let groups = self.grouper.group(batch);

        debug!(
            records = batch.len(),
            streams = groups.len(),
            first_id = batch.first().map(|r| r.id),
            last_id = batch_max,
            "Shipping batch"
        );

        self.sink.ship(&groups).await?;
        Ok((batch_max, groups.len()))
    }

    /// Persist `candidate` unless the checkpoint is already at or past it.
    ///
    /// The in-memory value only changes after the write succeeded.
    fn advance_checkpoint(&mut self, candidate: u64) -> Result<u64> {
        match self.checkpoint {
            Some(current) if current >= candidate => Ok(current),
            _ => {
                self.checkpoint_store.write(candidate)?;
                self.checkpoint = Some(candidate);
                Ok(candidate)
            }
        }
    }

    /// Run until `shutdown` resolves or a fatal error occurs.
    ///
    /// Shutdown is raced against the cycle as well as the sleep, so a stalled
    /// query or push cannot hold the process. A cycle can only be dropped at a
    /// fetch or a ship; the checkpoint write after a confirmed ship has no
    /// await point, so it is never split from its batch.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.start()?;
        info!(state = %self.state, "Entering polling loop");

        tokio::pin!(shutdown);
        loop {
            let cycle = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested mid-cycle, leaving polling loop");
                    return Ok(());
                }
                cycle = self.run_cycle() => cycle,
            };

            let delay = match cycle {
                Ok(outcome) if outcome.should_sleep() => self.config.poll_interval,
                Ok(_) => Duration::ZERO,
                Err(e) if e.is_fatal() => {
                    error!(error = %e, state = %self.state, "Fatal error, stopping");
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        state = %self.state,
                        checkpoint = self.checkpoint,
                        "Cycle failed; checkpoint unchanged, retrying next cycle"
                    );
                    self.config.poll_interval
                }
            };

            if !delay.is_zero() {
                debug!("Sleeping {} seconds", delay.as_secs());
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!(checkpoint = self.checkpoint, "Shutdown requested, leaving polling loop");
                    return Ok(());
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
