//! # Shipper Bootstrap
//!
//! Wires the production collaborators (MySQL source, Loki client, checkpoint
//! file) into a [`PollController`] and runs it until shutdown.

use std::future::Future;
use tracing::{info, warn};

use super::poll_controller::PollController;
use crate::checkpoint::FileCheckpointStore;
use crate::config::ShipperConfig;
use crate::database::{DatabaseConnection, MySqlLogSource};
use crate::error::Result;
use crate::grouping::{CommonLabels, StreamGrouper};
use crate::sink::LokiClient;

/// Controller type used by the shipper binary
pub type ShipperController = PollController<MySqlLogSource, LokiClient, FileCheckpointStore>;

/// Connect to the database and assemble the controller.
///
/// Connection and client setup failures are returned as errors so the binary
/// can exit non-zero before the loop starts.
pub async fn build_controller(config: &ShipperConfig) -> Result<(ShipperController, DatabaseConnection)> {
    let connection = DatabaseConnection::connect(&config.database).await?;
    if !connection.health_check().await? {
        warn!("Database health check returned an unexpected value");
    }
    let source = MySqlLogSource::new(
        connection.pool().clone(),
        &config.database.table,
        config.database.query_timeout,
    )?;
    let sink = LokiClient::new(&config.loki)?;
    let checkpoint_store = FileCheckpointStore::new(&config.pipeline.checkpoint_path);
    let grouper = StreamGrouper::new(CommonLabels::new(&config.loki.host, &config.loki.job));

    info!(
        table = source.table(),
        query_timeout_secs = config.database.query_timeout.as_secs(),
        push_url = sink.push_url(),
        checkpoint_path = %checkpoint_store.path().display(),
        poll_seconds = config.pipeline.poll_interval.as_secs(),
        batch_size = config.pipeline.batch_size,
        "Shipper components initialized"
    );

    let controller = PollController::new(
        source,
        sink,
        checkpoint_store,
        grouper,
        config.pipeline.clone(),
    );
    Ok((controller, connection))
}

/// Build the controller and run it until `shutdown` resolves
pub async fn run_shipper<F>(config: &ShipperConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let (mut controller, connection) = build_controller(config).await?;
    let result = controller.run(shutdown).await;
    connection.close().await;
    result
}
