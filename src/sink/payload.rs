//! Loki push API envelope.
//!
//! ```json
//! {"streams": [{"stream": {"label": "value"}, "values": [["<ns>", "<line>"]]}]}
//! ```

use serde::Serialize;
use std::collections::BTreeMap;

use crate::grouping::StreamGroup;

#[derive(Debug, Serialize)]
pub struct PushRequest<'a> {
    pub streams: Vec<PushStream<'a>>,
}

#[derive(Debug, Serialize)]
pub struct PushStream<'a> {
    pub stream: &'a BTreeMap<String, String>,
    pub values: Vec<[&'a str; 2]>,
}

impl<'a> PushRequest<'a> {
    pub fn from_groups(groups: &'a [StreamGroup]) -> Self {
        let streams = groups
            .iter()
            .map(|group| PushStream {
                stream: &group.labels,
                values: group
                    .entries
                    .iter()
                    .map(|entry| [entry.timestamp_ns.as_str(), entry.line.as_str()])
                    .collect(),
            })
            .collect();
        Self { streams }
    }

    pub fn entry_count(&self) -> usize {
        self.streams.iter().map(|s| s.values.len()).sum()
    }
}
