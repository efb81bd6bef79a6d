//! Test data builders for log rows

#![allow(dead_code)]

use zm_log_shipper::LogRecord;

/// Unix second every builder row is stamped relative to
pub const BASE_TIME: f64 = 1_703_574_639.334_704;

/// Builder pattern for creating test LogRecords
pub struct LogRecordBuilder {
    record: LogRecord,
}

impl LogRecordBuilder {
    pub fn new(id: u64) -> Self {
        Self {
            record: LogRecord {
                id,
                time_key: BASE_TIME + id as f64,
                component: "zmc_m2".to_string(),
                server_id: 0,
                pid: 79,
                level: 0,
                file: "zm_monitor.cpp".to_string(),
                line: 1680,
                message: format!("message {id}"),
            },
        }
    }

    pub fn with_time_key(mut self, time_key: f64) -> Self {
        self.record.time_key = time_key;
        self
    }

    pub fn with_component(mut self, component: &str) -> Self {
        self.record.component = component.to_string();
        self
    }

    pub fn with_level(mut self, level: i64) -> Self {
        self.record.level = level;
        self
    }

    pub fn with_line(mut self, line: i64) -> Self {
        self.record.line = line;
        self
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.record.message = message.to_string();
        self
    }

    pub fn build(self) -> LogRecord {
        self.record
    }
}

/// Rows `ids` that each get a distinct component, and so a distinct stream
pub fn distinct_records(ids: impl IntoIterator<Item = u64>) -> Vec<LogRecord> {
    ids.into_iter()
        .map(|id| {
            LogRecordBuilder::new(id)
                .with_component(&format!("zmc_m{id}"))
                .build()
        })
        .collect()
}

/// Rows `ids` that all share the same metadata
pub fn same_stream_records(ids: impl IntoIterator<Item = u64>) -> Vec<LogRecord> {
    ids.into_iter()
        .map(|id| LogRecordBuilder::new(id).build())
        .collect()
}
