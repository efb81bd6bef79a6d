//! # Stream Grouping
//!
//! Turns a batch of log rows into Loki streams. Rows whose metadata is
//! identical share one stream; each stream keeps its rows in id order.
//!
//! Grouping is a pure function of the batch and the process-wide common
//! labels, so re-grouping a batch that failed to ship yields the same payload.

pub mod level;

use std::collections::{BTreeMap, HashMap};

use crate::models::LogRecord;

pub use level::LogLevel;

/// Metadata identifying one Loki stream
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelKey {
    pub component: String,
    pub server_id: i64,
    pub pid: i64,
    pub level: LogLevel,
    pub file: String,
    pub line: i64,
}

impl LabelKey {
    pub fn from_record(record: &LogRecord) -> Self {
        Self {
            component: record.component.clone(),
            server_id: record.server_id,
            pid: record.pid,
            level: LogLevel::from_zm(record.level),
            file: record.file.clone(),
            line: record.line,
        }
    }

    /// Label set for this key, merged with the common labels
    pub fn labels(&self, common: &CommonLabels) -> BTreeMap<String, String> {
        let mut labels = common.to_map();
        labels.insert("component".to_string(), self.component.clone());
        labels.insert("server_id".to_string(), self.server_id.to_string());
        labels.insert("pid".to_string(), self.pid.to_string());
        labels.insert("level".to_string(), self.level.name());
        labels.insert("file".to_string(), self.file.clone());
        labels.insert("line".to_string(), self.line.to_string());
        labels
    }
}

/// Labels attached to every stream the process ships.
///
/// The names are fixed and never collide with per-record label names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonLabels {
    pub host: String,
    pub job: String,
}

impl CommonLabels {
    pub fn new(host: impl Into<String>, job: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            job: job.into(),
        }
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("host".to_string(), self.host.clone()),
            ("job".to_string(), self.job.clone()),
        ])
    }
}

/// One `[timestamp, line]` value of a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    /// Unix nanoseconds as a decimal string, whole seconds only
    pub timestamp_ns: String,
    pub line: String,
}

impl StreamEntry {
    fn from_record(record: &LogRecord) -> Self {
        Self {
            timestamp_ns: record.timestamp_nanos().to_string(),
            line: record.message.clone(),
        }
    }
}

/// All rows of a batch that share a [`LabelKey`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamGroup {
    pub key: LabelKey,
    pub labels: BTreeMap<String, String>,
    pub entries: Vec<StreamEntry>,
}

#[derive(Debug, Clone)]
pub struct StreamGrouper {
    common: CommonLabels,
}

impl StreamGrouper {
    pub fn new(common: CommonLabels) -> Self {
        Self { common }
    }

    pub fn common_labels(&self) -> &CommonLabels {
        &self.common
    }

    /// Group `batch` into streams ordered by first appearance.
    ///
    /// `batch` must already be in id order; entries inherit that order.
    pub fn group(&self, batch: &[LogRecord]) -> Vec<StreamGroup> {
        let mut index: HashMap<LabelKey, usize> = HashMap::new();
        let mut groups: Vec<StreamGroup> = Vec::new();

        for record in batch {
            let key = LabelKey::from_record(record);
            let slot = match index.get(&key) {
                Some(&slot) => slot,
                None => {
                    groups.push(StreamGroup {
                        labels: key.labels(&self.common),
                        key: key.clone(),
                        entries: Vec::new(),
                    });
                    index.insert(key, groups.len() - 1);
                    groups.len() - 1
                }
            };
            groups[slot].entries.push(StreamEntry::from_record(record));
        }

        groups
    }
}
