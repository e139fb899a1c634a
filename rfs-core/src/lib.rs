//! Core types for the river flow synthesizer.
//!
//! Holds the pieces every other `rfs-*` crate shares: the run configuration,
//! the error type, the per-day sample container, and the parsers that turn
//! raw sensor exports into joined training datasets.

pub mod config;
pub mod error;
pub mod forcing;
pub mod observation;
pub mod sample;
pub mod training;

pub use config::SimulationConfig;
pub use error::{Result, RfsError};
pub use forcing::Forcing;
pub use sample::{DaySeries, Sample, SimulationOutput};

/// Seconds in one day, the time unit of the daily training aggregates.
pub const SECONDS_PER_DAY: f64 = 86_400.0;
