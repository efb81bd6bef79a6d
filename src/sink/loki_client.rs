//! # Loki Push Client
//!
//! Sends one grouped batch per request to Loki's push API. Loki answers a
//! successful push with `204 No Content`; anything else, including other 2xx
//! codes, is treated as a failure. The client never retries on its own.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use tracing::{debug, warn};

use super::errors::{SinkError, SinkResult};
use super::payload::PushRequest;
use crate::config::LokiConfig;
use crate::grouping::StreamGroup;

/// Delivery seam for grouped batches
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Deliver `groups` as one payload.
    ///
    /// A non-empty batch is `Ok` only on confirmed acceptance. An empty batch
    /// has nothing to deliver and is `Ok` without contacting the sink.
    async fn ship(&self, groups: &[StreamGroup]) -> SinkResult<()>;
}

#[derive(Clone)]
pub struct LokiClient {
    client: Client,
    push_url: String,
}

impl std::fmt::Debug for LokiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LokiClient")
            .field("push_url", &self.push_url)
            .finish()
    }
}

impl LokiClient {
    pub fn new(config: &LokiConfig) -> SinkResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| SinkError::setup(e.to_string()))?;

        Ok(Self {
            client,
            push_url: config.push_url.clone(),
        })
    }

    pub fn push_url(&self) -> &str {
        &self.push_url
    }
}

#[async_trait]
impl LogSink for LokiClient {
    async fn ship(&self, groups: &[StreamGroup]) -> SinkResult<()> {
        if groups.is_empty() {
            return Ok(());
        }

        let request = PushRequest::from_groups(groups);
        let body = serde_json::to_vec(&request)?;
        debug!(
            url = %self.push_url,
            streams = request.streams.len(),
            entries = request.entry_count(),
            bytes = body.len(),
            "Pushing to Loki"
        );

        let response = self
            .client
            .post(&self.push_url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), body = %body, "Loki rejected push");
        Err(SinkError::unexpected_status(status.as_u16(), body))
    }
}
