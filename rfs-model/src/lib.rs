//! Statistical predictors and the daily simulation loop.
//!
//! A [`Predictor`] is fitted once from historical data and shared by
//! reference. [`DaySimulator`] reconciles flow rate and water level for one
//! day, and [`run::simulate_horizon`] chains days by carrying the final level
//! forward. Every random draw comes from an explicitly passed generator, so
//! a run is reproducible from its seed.

pub mod predictor;
pub mod regression;
pub mod rng;
pub mod run;
pub mod simulator;

pub use predictor::{FitReport, FlowCurve, FlowRegime, LevelDerivativeCurve, Predictor};
pub use rng::SimRng;
pub use run::simulate_horizon;
pub use simulator::{DayOutcome, DaySimulator};
