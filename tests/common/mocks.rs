//! In-memory collaborators for exercising the poll controller without MySQL
//! or Loki. Each mock is a cheap handle over shared state so a test can keep
//! a clone after handing one to the controller.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use zm_log_shipper::database::{SourceError, SourceResult};
use zm_log_shipper::sink::{SinkError, SinkResult};
use zm_log_shipper::{LogRecord, LogSink, RowSource, StreamGroup};

#[derive(Debug, Default)]
struct MockSourceState {
    rows: Vec<LogRecord>,
    failures_remaining: usize,
    stalls_remaining: usize,
    timeouts_remaining: usize,
    fetch_after_calls: Vec<u64>,
    fetch_since_calls: Vec<(i64, u64)>,
    max_id_calls: usize,
}

/// Log table held in memory, always served in id order
#[derive(Debug, Clone, Default)]
pub struct MockRowSource {
    state: Arc<Mutex<MockSourceState>>,
}

impl MockRowSource {
    pub fn new(rows: Vec<LogRecord>) -> Self {
        let source = Self::default();
        source.insert(rows);
        source
    }

    /// Append rows as an external writer would
    pub fn insert(&self, rows: Vec<LogRecord>) {
        let mut state = self.state.lock().unwrap();
        state.rows.extend(rows);
        state.rows.sort_by_key(|r| r.id);
    }

    /// Fail the next `count` queries of any kind
    pub fn fail_next(&self, count: usize) {
        self.state.lock().unwrap().failures_remaining = count;
    }

    /// Make the next `count` row fetches hang forever, like a server that
    /// stopped answering mid-query
    pub fn stall_next(&self, count: usize) {
        self.state.lock().unwrap().stalls_remaining = count;
    }

    /// Fail the next `count` queries the way an expired query deadline does
    pub fn time_out_next(&self, count: usize) {
        self.state.lock().unwrap().timeouts_remaining = count;
    }

    fn take_stall(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.stalls_remaining > 0 {
            state.stalls_remaining -= 1;
            return true;
        }
        false
    }

    pub fn fetch_after_calls(&self) -> Vec<u64> {
        self.state.lock().unwrap().fetch_after_calls.clone()
    }

    pub fn fetch_since_calls(&self) -> Vec<(i64, u64)> {
        self.state.lock().unwrap().fetch_since_calls.clone()
    }

    pub fn max_id_calls(&self) -> usize {
        self.state.lock().unwrap().max_id_calls
    }

    fn check_failure(state: &mut MockSourceState, operation: &str) -> SourceResult<()> {
        if state.timeouts_remaining > 0 {
            state.timeouts_remaining -= 1;
            return Err(SourceError::timeout(operation, Duration::from_secs(30)));
        }
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(SourceError::connection(format!(
                "{operation}: Lost connection to MySQL server during query"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RowSource for MockRowSource {
    async fn fetch_after(&self, after_id: u64, limit: u32) -> SourceResult<Vec<LogRecord>> {
        if self.take_stall() {
            return std::future::pending().await;
        }
        let mut state = self.state.lock().unwrap();
        state.fetch_after_calls.push(after_id);
        Self::check_failure(&mut state, "fetch_after")?;

        Ok(state
            .rows
            .iter()
            .filter(|r| r.id > after_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn fetch_since(
        &self,
        threshold: i64,
        after_id: u64,
        limit: u32,
    ) -> SourceResult<Vec<LogRecord>> {
        if self.take_stall() {
            return std::future::pending().await;
        }
        let mut state = self.state.lock().unwrap();
        state.fetch_since_calls.push((threshold, after_id));
        Self::check_failure(&mut state, "fetch_since")?;

        Ok(state
            .rows
            .iter()
            .filter(|r| r.time_key >= threshold as f64 && r.id > after_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn max_id(&self) -> SourceResult<Option<u64>> {
        let mut state = self.state.lock().unwrap();
        state.max_id_calls += 1;
        Self::check_failure(&mut state, "max_id")?;
        Ok(state.rows.iter().map(|r| r.id).max())
    }

    async fn min_id(&self) -> SourceResult<Option<u64>> {
        let mut state = self.state.lock().unwrap();
        Self::check_failure(&mut state, "min_id")?;
        Ok(state.rows.iter().map(|r| r.id).min())
    }
}

#[derive(Debug, Default)]
struct MockSinkState {
    accepted: Vec<Vec<StreamGroup>>,
    attempts: Vec<Vec<StreamGroup>>,
    failures_remaining: usize,
}

/// Sink that records every payload and can be told to reject pushes
#[derive(Debug, Clone, Default)]
pub struct MockSink {
    state: Arc<Mutex<MockSinkState>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` pushes with a 500
    pub fn fail_next(&self, count: usize) {
        self.state.lock().unwrap().failures_remaining = count;
    }

    /// Payloads Loki confirmed
    pub fn accepted(&self) -> Vec<Vec<StreamGroup>> {
        self.state.lock().unwrap().accepted.clone()
    }

    /// Every payload offered, accepted or not
    pub fn attempts(&self) -> Vec<Vec<StreamGroup>> {
        self.state.lock().unwrap().attempts.clone()
    }

    /// Messages confirmed delivered, in delivery order
    pub fn delivered_messages(&self) -> Vec<String> {
        self.accepted()
            .iter()
            .flatten()
            .flat_map(|g| g.entries.iter().map(|e| e.line.clone()))
            .collect()
    }
}

#[async_trait]
impl LogSink for MockSink {
    async fn ship(&self, groups: &[StreamGroup]) -> SinkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.attempts.push(groups.to_vec());

        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(SinkError::unexpected_status(500, "internal server error"));
        }

        state.accepted.push(groups.to_vec());
        Ok(())
    }
}
