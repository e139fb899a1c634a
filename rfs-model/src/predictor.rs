//! The two fitted regression models and their inference rules.

use crate::regression::{sample_std, train_test_split, validate_fit, Polynomial, ValidationStats};
use log::{info, warn};
use rand::Rng;
use rand_distr::StandardNormal;
use rfs_core::training::TrainingData;
use rfs_core::{Result, RfsError, SimulationConfig};

/// Degree of the flow-against-level rating curve.
pub const FLOW_CURVE_DEGREE: usize = 3;

/// Degree of the level-derivative-against-water-difference line.
pub const LEVEL_CURVE_DEGREE: usize = 1;

/// Residual spread below this is treated as no spread at all, m.
pub const MIN_RESIDUAL_STD: f64 = 1e-12;

/// Which branch of the flow curve a level falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowRegime {
    /// At or below the fitted range: near-zero stochastic flow
    Low,
    /// Inside the fitted range: the cubic rating curve
    Rated,
    /// At or above the fitted range: linear extrapolation
    High,
}

/// Flow rate as a function of water level.
///
/// The cubic is only trusted inside `(low_bound, high_bound)`. Above it a
/// line of fixed slope is stitched on, shifted by `offset` so that it meets
/// the cubic at `high_bound`; the shift is computed once here rather than
/// per call.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowCurve {
    rating: Polynomial,
    low_bound: f64,
    high_bound: f64,
    slope: f64,
    offset: f64,
    low_flow_std: f64,
}

impl FlowCurve {
    pub fn new(rating: Polynomial, config: &SimulationConfig) -> Result<Self> {
        if !rating.is_finite() {
            return Err(RfsError::DegenerateFit(
                "flow curve has non-finite coefficients".into(),
            ));
        }
        let offset = config.extrapolation_intercept - rating.evaluate(config.flow_curve_high);
        Ok(Self {
            rating,
            low_bound: config.flow_curve_low,
            high_bound: config.flow_curve_high,
            slope: config.extrapolation_slope,
            offset,
            low_flow_std: config.low_flow_std,
        })
    }

    pub fn regime(&self, level: f64) -> FlowRegime {
        if level <= self.low_bound {
            FlowRegime::Low
        } else if level >= self.high_bound {
            FlowRegime::High
        } else {
            FlowRegime::Rated
        }
    }

    /// The cubic alone, without the boundary rules.
    pub fn rated(&self, level: f64) -> f64 {
        self.rating.evaluate(level)
    }

    pub fn rating(&self) -> &Polynomial {
        &self.rating
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Flow rate for `level`, m3/s.
    ///
    /// Only the low regime touches `rng`: it redraws from
    /// `Normal(0, low_flow_std)` until the draw is non-negative.
    pub fn predict<R: Rng + ?Sized>(&self, level: f64, rng: &mut R) -> f64 {
        match self.regime(level) {
            FlowRegime::Low => self.low_flow(rng),
            FlowRegime::High => level * self.slope - self.offset,
            FlowRegime::Rated => self.rating.evaluate(level),
        }
    }

    fn low_flow<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.low_flow_std == 0.0 {
            return 0.0;
        }
        loop {
            let z: f64 = rng.sample(StandardNormal);
            let draw = z * self.low_flow_std;
            if draw >= 0.0 {
                return draw;
            }
        }
    }
}

/// Daily level change as a function of daily water difference, with
/// Gaussian residual noise.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelDerivativeCurve {
    line: Polynomial,
    residual_std: f64,
}

impl LevelDerivativeCurve {
    pub fn new(line: Polynomial, residual_std: f64) -> Result<Self> {
        if !line.is_finite() {
            return Err(RfsError::DegenerateFit(
                "level-derivative line has non-finite coefficients".into(),
            ));
        }
        if !residual_std.is_finite() || residual_std < MIN_RESIDUAL_STD {
            return Err(RfsError::DegenerateFit(format!(
                "residual standard deviation must be at least {}, got {}",
                MIN_RESIDUAL_STD,
                residual_std
            )));
        }
        Ok(Self { line, residual_std })
    }

    /// Central estimate without noise, m.
    pub fn mean(&self, water_difference: f64) -> f64 {
        self.line.evaluate(water_difference)
    }

    pub fn residual_std(&self) -> f64 {
        self.residual_std
    }

    pub fn line(&self) -> &Polynomial {
        &self.line
    }

    /// One draw from `Normal(mean(water_difference), residual_std)`.
    pub fn predict<R: Rng + ?Sized>(&self, water_difference: f64, rng: &mut R) -> f64 {
        let z: f64 = rng.sample(StandardNormal);
        self.mean(water_difference) + self.residual_std * z
    }
}

/// What training saw and how well the fits validated.
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    /// Quarter-hourly rows inside the rated level range
    pub flow_rows: usize,
    pub flow_validation: Option<ValidationStats>,
    /// Daily rows below the outlier threshold
    pub level_rows: usize,
    /// Daily rows left out as outliers
    pub level_outliers: usize,
    pub level_validation: Option<ValidationStats>,
    pub residual_std: f64,
}

/// Both fitted models. Immutable once built; share it by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Predictor {
    flow: FlowCurve,
    level: LevelDerivativeCurve,
}

impl Predictor {
    pub fn from_curves(flow: FlowCurve, level: LevelDerivativeCurve) -> Self {
        Self { flow, level }
    }

    /// Fit both models from the joined historical datasets.
    pub fn train(data: &TrainingData, config: &SimulationConfig) -> Result<(Self, FitReport)> {
        config.validate()?;

        let (level_x, flow_y): (Vec<f64>, Vec<f64>) = data
            .quarter_hourly
            .iter()
            .filter(|r| r.water_level > config.flow_curve_low && r.water_level < config.flow_curve_high)
            .map(|r| (r.water_level, r.flow_rate))
            .unzip();
        if level_x.is_empty() {
            return Err(RfsError::TrainingData(format!(
                "no quarter-hourly rows with level in ({}, {})",
                config.flow_curve_low, config.flow_curve_high
            )));
        }
        let split = train_test_split(level_x.len(), config.validation_fraction, config.split_seed);
        let flow_validation = validate_fit(&level_x, &flow_y, FLOW_CURVE_DEGREE, &split);
        let rating = Polynomial::fit(&level_x, &flow_y, FLOW_CURVE_DEGREE)?;
        let flow = FlowCurve::new(rating, config)?;

        let (diff_x, deriv_y): (Vec<f64>, Vec<f64>) = data
            .daily
            .iter()
            .filter(|r| r.water_difference.abs() < config.outlier_threshold)
            .map(|r| (r.water_difference, r.level_derivative))
            .unzip();
        let level_outliers = data.daily.len() - diff_x.len();
        if diff_x.is_empty() {
            return Err(RfsError::TrainingData(format!(
                "no daily rows with |water difference| below {}",
                config.outlier_threshold
            )));
        }
        let split = train_test_split(diff_x.len(), config.validation_fraction, config.split_seed);
        let level_validation = validate_fit(&diff_x, &deriv_y, LEVEL_CURVE_DEGREE, &split);
        let line = Polynomial::fit(&diff_x, &deriv_y, LEVEL_CURVE_DEGREE)?;

        let residuals: Vec<f64> = split
            .test
            .iter()
            .map(|&i| deriv_y[i] - line.evaluate(diff_x[i]))
            .collect();
        let residual_std = sample_std(&residuals).ok_or_else(|| {
            RfsError::DegenerateFit(format!(
                "{} held-out days are too few for a residual spread",
                residuals.len()
            ))
        })?;
        let level = LevelDerivativeCurve::new(line, residual_std)?;

        let report = FitReport {
            flow_rows: level_x.len(),
            flow_validation,
            level_rows: diff_x.len(),
            level_outliers,
            level_validation,
            residual_std,
        };
        log_report(&report);
        Ok((Self { flow, level }, report))
    }

    /// Flow rate for a water level, m3/s.
    pub fn predict_flow<R: Rng + ?Sized>(&self, level: f64, rng: &mut R) -> f64 {
        self.flow.predict(level, rng)
    }

    /// Stochastic daily level change for a daily water difference, m.
    pub fn predict_level_derivative<R: Rng + ?Sized>(&self, water_difference: f64, rng: &mut R) -> f64 {
        self.level.predict(water_difference, rng)
    }

    pub fn flow_curve(&self) -> &FlowCurve {
        &self.flow
    }

    pub fn level_curve(&self) -> &LevelDerivativeCurve {
        &self.level
    }
}

fn log_report(report: &FitReport) {
    info!(
        "flow curve fitted on {} rows; level curve on {} days ({} outliers excluded), residual std {:.5}",
        report.flow_rows, report.level_rows, report.level_outliers, report.residual_std
    );
    for (name, stats) in [
        ("flow curve", &report.flow_validation),
        ("level curve", &report.level_validation),
    ] {
        match stats {
            Some(s) => info!(
                "{}: MSE train {:.3}, test {:.3}; R^2 train {:.3}, test {:.3}",
                name, s.mse_train, s.mse_test, s.r2_train, s.r2_test
            ),
            None => warn!("{}: too few rows for a validation split", name),
        }
    }
}
