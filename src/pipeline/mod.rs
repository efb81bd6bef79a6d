//! # Shipping Pipeline
//!
//! - [`poll_controller`] - Startup decision, backfill and the polling loop
//! - [`state`] - Controller lifecycle states and cycle outcomes
//! - [`bootstrap`] - Production wiring for the binary

pub mod bootstrap;
pub mod poll_controller;
pub mod state;

pub use bootstrap::{build_controller, run_shipper, ShipperController};
pub use poll_controller::{Clock, PollController};
pub use state::{BackfillProgress, CycleOutcome, PipelineState};
