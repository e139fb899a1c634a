use crate::error::{Result, RfsError};
use crate::SECONDS_PER_DAY;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default catchment area in km2.
pub const DEFAULT_CATCHMENT_AREA_KM2: f64 = 58.5;

/// Default fraction of catchment rainfall that reaches the river.
pub const DEFAULT_INFILTRATION_FRACTION: f64 = 0.76;

/// Quarter-hour samples in one day.
pub const DEFAULT_SAMPLES_PER_DAY: usize = 96;

/// Refinement passes of the flow/level loop per day.
pub const DEFAULT_REFINEMENT_PASSES: usize = 35;

/// Samples per day must divide this so output rows fall on whole minutes.
pub const MINUTES_PER_DAY: usize = 24 * 60;

/// Calibration and run constants for one simulation.
///
/// Every field has a default matching the reference catchment, so a JSON
/// config file only needs to name the values it changes:
///
/// ```text
/// { "catchment_area_km2": 61.2, "seed": 7 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Area draining into the modelled river, km2
    pub catchment_area_km2: f64,
    /// Fraction of rainfall over the catchment reaching the river
    pub infiltration_fraction: f64,
    pub samples_per_day: usize,
    pub refinement_passes: usize,
    /// Stop a day early once the largest level change of a pass drops below
    /// this value. `None` always runs `refinement_passes`.
    pub convergence_tolerance: Option<f64>,
    /// Hard physical floor for the water level, m
    pub level_floor: f64,
    /// Hard physical ceiling for the water level, m
    pub level_ceiling: f64,
    /// Lower edge of the fitted flow curve, m
    pub flow_curve_low: f64,
    /// Upper edge of the fitted flow curve, m
    pub flow_curve_high: f64,
    pub extrapolation_slope: f64,
    pub extrapolation_intercept: f64,
    /// Spread of the near-zero flow draws below `flow_curve_low`, m3/s
    pub low_flow_std: f64,
    /// Per-sample level jitter, m
    pub jitter_std: f64,
    /// Days with |water difference| at or above this are left out of the
    /// level-derivative fit, m3
    pub outlier_threshold: f64,
    /// Share of rows held out for validation reporting
    pub validation_fraction: f64,
    pub split_seed: u64,
    /// Seed of the simulation random stream
    pub seed: u64,
    /// Level at which low-lying land (farm, marshland) floods, m
    pub low_lying_land_flooding_level: f64,
    /// Level at which property floods, m
    pub property_flooding_level: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            catchment_area_km2: DEFAULT_CATCHMENT_AREA_KM2,
            infiltration_fraction: DEFAULT_INFILTRATION_FRACTION,
            samples_per_day: DEFAULT_SAMPLES_PER_DAY,
            refinement_passes: DEFAULT_REFINEMENT_PASSES,
            convergence_tolerance: None,
            level_floor: 0.1,
            level_ceiling: 2.6,
            flow_curve_low: 0.2,
            flow_curve_high: 2.0,
            extrapolation_slope: 30.0,
            extrapolation_intercept: 60.0,
            low_flow_std: 0.01,
            jitter_std: 1e-4,
            outlier_threshold: 2_000_000.0,
            validation_fraction: 0.3,
            split_seed: 0,
            seed: 42,
            low_lying_land_flooding_level: 1.8,
            property_flooding_level: 2.3,
        }
    }
}

impl SimulationConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: SimulationConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Cubic metres reaching the river per millimetre of rain over the
    /// whole catchment.
    pub fn rain_volume_const(&self) -> f64 {
        self.catchment_area_km2 * 1_000_000.0 * 0.001 * self.infiltration_fraction
    }

    /// Duration of one simulation sample in seconds (900 for 96 samples).
    pub fn seconds_per_sample(&self) -> f64 {
        SECONDS_PER_DAY / self.samples_per_day as f64
    }

    /// Clamp a level into `[level_floor, level_ceiling]`.
    pub fn clamp_level(&self, level: f64) -> f64 {
        level.clamp(self.level_floor, self.level_ceiling)
    }

    /// Reject combinations of values that cannot describe a run.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("level_floor", self.level_floor),
            ("level_ceiling", self.level_ceiling),
            ("flow_curve_low", self.flow_curve_low),
            ("flow_curve_high", self.flow_curve_high),
            ("extrapolation_slope", self.extrapolation_slope),
            ("extrapolation_intercept", self.extrapolation_intercept),
            ("validation_fraction", self.validation_fraction),
            ("low_lying_land_flooding_level", self.low_lying_land_flooding_level),
            ("property_flooding_level", self.property_flooding_level),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(RfsError::Config(format!(
                    "{} must be finite, got {}",
                    name, value
                )));
            }
        }
        let positive = [
            ("catchment_area_km2", self.catchment_area_km2),
            ("infiltration_fraction", self.infiltration_fraction),
            ("outlier_threshold", self.outlier_threshold),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(RfsError::Config(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        let non_negative = [
            ("low_flow_std", self.low_flow_std),
            ("jitter_std", self.jitter_std),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(RfsError::Config(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }
        if self.infiltration_fraction > 1.0 {
            return Err(RfsError::Config(format!(
                "infiltration_fraction must not exceed 1, got {}",
                self.infiltration_fraction
            )));
        }
        if self.samples_per_day == 0 {
            return Err(RfsError::Config("samples_per_day must be at least 1".into()));
        }
        if MINUTES_PER_DAY % self.samples_per_day != 0 {
            return Err(RfsError::Config(format!(
                "samples_per_day {} does not split a day into whole minutes",
                self.samples_per_day
            )));
        }
        if self.refinement_passes == 0 {
            return Err(RfsError::Config("refinement_passes must be at least 1".into()));
        }
        if self.level_floor >= self.level_ceiling {
            return Err(RfsError::Config(format!(
                "level_floor {} must be below level_ceiling {}",
                self.level_floor, self.level_ceiling
            )));
        }
        if self.flow_curve_low >= self.flow_curve_high {
            return Err(RfsError::Config(format!(
                "flow_curve_low {} must be below flow_curve_high {}",
                self.flow_curve_low, self.flow_curve_high
            )));
        }
        if !(self.validation_fraction > 0.0 && self.validation_fraction < 1.0) {
            return Err(RfsError::Config(format!(
                "validation_fraction must lie in (0, 1), got {}",
                self.validation_fraction
            )));
        }
        if let Some(tolerance) = self.convergence_tolerance {
            if !tolerance.is_finite() || tolerance <= 0.0 {
                return Err(RfsError::Config(format!(
                    "convergence_tolerance must be positive, got {}",
                    tolerance
                )));
            }
        }
        Ok(())
    }
}
