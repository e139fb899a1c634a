//! One simulated day: reconcile flow rate and water level.
//!
//! Flow depends on level through the rating curve, and level depends on the
//! day's water balance, which depends on flow. There is no closed form, so
//! each day runs a fixed number of refinement passes:
//!
//! 1. water difference per sample from rainfall, dam inflow and flow
//! 2. one stochastic daily level change from the summed difference
//! 3. that change spread over the samples in proportion to their share,
//!    with a little per-sample jitter
//! 4. levels integrated from the starting level, clamped at every step
//! 5. flow recomputed from the new levels

use crate::predictor::Predictor;
use log::trace;
use rand::Rng;
use rand_distr::StandardNormal;
use rfs_core::{DaySeries, Result, SimulationConfig};

/// A finished day and how many refinement passes it took.
#[derive(Debug, Clone, PartialEq)]
pub struct DayOutcome {
    pub series: DaySeries,
    pub passes: usize,
}

impl DayOutcome {
    pub fn flow_rates(&self) -> Vec<f64> {
        self.series.flow_rates()
    }

    pub fn water_levels(&self) -> Vec<f64> {
        self.series.water_levels()
    }

    /// Seed level for the next day.
    pub fn final_level(&self) -> f64 {
        self.series.final_level()
    }
}

/// Runs the refinement loop for single days against a shared predictor.
#[derive(Debug, Clone, Copy)]
pub struct DaySimulator<'a> {
    predictor: &'a Predictor,
    config: &'a SimulationConfig,
}

impl<'a> DaySimulator<'a> {
    pub fn new(predictor: &'a Predictor, config: &'a SimulationConfig) -> Self {
        Self { predictor, config }
    }

    /// Simulate one day of `samples_per_day` samples.
    ///
    /// `starting_level` is clamped into the physical bounds before use.
    pub fn simulate_day<R: Rng + ?Sized>(
        &self,
        rainfall: &[f64],
        dam_inflow: Option<&[f64]>,
        starting_level: f64,
        rng: &mut R,
    ) -> Result<DayOutcome> {
        let start = self.config.clamp_level(starting_level);
        let mut day = DaySeries::new(
            rainfall,
            dam_inflow,
            start,
            self.config.catchment_area_km2,
            self.config.samples_per_day,
        )?;

        // initial guess: the starting level held all day
        let initial_flow = self.predictor.predict_flow(start, rng);
        for s in day.samples.iter_mut() {
            s.water_level = start;
            s.flow_rate = initial_flow;
        }

        let mut passes = 0;
        while passes < self.config.refinement_passes {
            let change = self.refine(&mut day, rng);
            passes += 1;
            if let Some(tolerance) = self.config.convergence_tolerance {
                if change < tolerance {
                    break;
                }
            }
        }
        trace!(
            "day from {:.3} m settled at {:.3} m after {} passes",
            start,
            day.final_level(),
            passes
        );

        Ok(DayOutcome {
            series: day,
            passes,
        })
    }

    /// Net inflow per sample in m3: rain-derived and dam inflow minus outflow.
    pub fn water_differences(&self, day: &DaySeries) -> Vec<f64> {
        let rain_volume = self.config.rain_volume_const();
        let seconds = self.config.seconds_per_sample();
        day.samples
            .iter()
            .map(|s| s.rainfall * rain_volume + (s.dam_inflow - s.flow_rate) * seconds)
            .collect()
    }

    /// One refinement pass. Returns the largest absolute level change.
    fn refine<R: Rng + ?Sized>(&self, day: &mut DaySeries, rng: &mut R) -> f64 {
        let start = day.starting_water_level;
        let differences = self.water_differences(day);
        let daily: f64 = differences.iter().sum();

        let mut derivative = self.predictor.predict_level_derivative(daily, rng);
        let floor = self.config.flow_curve_low;
        if start + derivative < floor {
            derivative = floor - start;
        }

        let steps = distribute_derivative(derivative, &differences, self.config.jitter_std, rng);
        let levels = integrate_levels(start, &steps, self.config);

        let mut change: f64 = 0.0;
        for (s, level) in day.samples.iter_mut().zip(levels) {
            change = change.max((level - s.water_level).abs());
            s.water_level = level;
            s.flow_rate = self.predictor.predict_flow(level, rng);
        }
        change
    }
}

/// Split a daily level change into per-sample steps.
///
/// Each sample gets `derivative * difference[i] / sum(difference)`; a zero
/// daily sum spreads the change evenly. Every sample then gets an
/// independent `Normal(0, jitter_std)` offset.
pub fn distribute_derivative<R: Rng + ?Sized>(
    derivative: f64,
    differences: &[f64],
    jitter_std: f64,
    rng: &mut R,
) -> Vec<f64> {
    let n = differences.len();
    let daily: f64 = differences.iter().sum();
    differences
        .iter()
        .map(|wd| {
            let share = if daily == 0.0 {
                derivative / n as f64
            } else {
                derivative * wd / daily
            };
            let z: f64 = rng.sample(StandardNormal);
            share + jitter_std * z
        })
        .collect()
}

/// Integrate per-sample steps from `start`.
///
/// `level[0]` is the start itself; the first step is not applied. Every level
/// is clamped as soon as it is computed, so a clamped value is the base of
/// the next step.
pub fn integrate_levels(start: f64, steps: &[f64], config: &SimulationConfig) -> Vec<f64> {
    let mut levels = Vec::with_capacity(steps.len());
    let mut current = config.clamp_level(start);
    for (i, step) in steps.iter().enumerate() {
        if i > 0 {
            current = config.clamp_level(current + step);
        }
        levels.push(current);
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::{FlowCurve, LevelDerivativeCurve};
    use crate::regression::Polynomial;
    use crate::rng::SimRng;
    use approx::assert_relative_eq;

    fn predictor(config: &SimulationConfig) -> Predictor {
        let flow = FlowCurve::new(Polynomial::new(vec![2.0, 8.0, 6.0]), config).unwrap();
        let level = LevelDerivativeCurve::new(Polynomial::new(vec![0.0, 1e-7]), 0.002).unwrap();
        Predictor::from_curves(flow, level)
    }

    #[test]
    fn even_split_when_daily_sum_is_zero() {
        let mut rng = SimRng::default();
        let steps = distribute_derivative(0.96, &[5.0, -5.0, 0.0, 0.0], 0.0, &mut rng.0);
        for step in steps {
            assert_relative_eq!(step, 0.24);
        }
    }

    #[test]
    fn proportional_split_follows_shares() {
        let mut rng = SimRng::default();
        let steps = distribute_derivative(0.1, &[1.0, 3.0], 0.0, &mut rng.0);
        assert_relative_eq!(steps[0], 0.025);
        assert_relative_eq!(steps[1], 0.075);
    }

    #[test]
    fn jitter_moves_steps() {
        let mut rng = SimRng::default();
        let steps = distribute_derivative(0.0, &[1.0; 96], 1e-4, &mut rng.0);
        assert!(steps.iter().any(|s| *s != 0.0));
        assert!(steps.iter().all(|s| s.abs() < 1e-3));
    }

    #[test]
    fn integration_clamps_every_step() {
        let config = SimulationConfig::default();
        let levels = integrate_levels(2.5, &[0.0, 0.3, -0.1, -0.1], &config);
        // 2.8 clamps to 2.6 and the next step starts from 2.6
        assert_eq!(levels[0], 2.5);
        assert_eq!(levels[1], 2.6);
        assert_relative_eq!(levels[2], 2.5, epsilon = 1e-12);
        assert_relative_eq!(levels[3], 2.4, epsilon = 1e-12);
    }

    #[test]
    fn integration_ignores_first_step() {
        let config = SimulationConfig::default();
        let levels = integrate_levels(0.5, &[10.0, 0.1], &config);
        assert_eq!(levels[0], 0.5);
        assert_relative_eq!(levels[1], 0.6, epsilon = 1e-12);
    }

    #[test]
    fn water_difference_uses_quarter_hour_seconds() {
        let config = SimulationConfig::default();
        let predictor = predictor(&config);
        let sim = DaySimulator::new(&predictor, &config);
        let mut day = DaySeries::new(&[1.0; 96], Some(&[2.0; 96]), 0.5, 58.5, 96).unwrap();
        for s in day.samples.iter_mut() {
            s.flow_rate = 3.0;
        }
        let wd = sim.water_differences(&day);
        let expected = config.rain_volume_const() + (2.0 - 3.0) * 900.0;
        assert_relative_eq!(wd[0], expected, epsilon = 1e-9);
    }

    #[test]
    fn wrong_day_length_is_rejected() {
        let config = SimulationConfig::default();
        let predictor = predictor(&config);
        let sim = DaySimulator::new(&predictor, &config);
        let mut rng = SimRng::default();
        let result = sim.simulate_day(&[0.0; 48], None, 0.45, &mut rng.0);
        assert!(matches!(result, Err(rfs_core::RfsError::InputShape { .. })));
    }

    #[test]
    fn runs_the_full_pass_budget_by_default() {
        let config = SimulationConfig::default();
        let predictor = predictor(&config);
        let sim = DaySimulator::new(&predictor, &config);
        let mut rng = SimRng::default();
        let outcome = sim.simulate_day(&[0.0; 96], None, 0.45, &mut rng.0).unwrap();
        assert_eq!(outcome.passes, 35);
    }

    #[test]
    fn tolerance_can_stop_early() {
        let config = SimulationConfig {
            convergence_tolerance: Some(10.0),
            ..SimulationConfig::default()
        };
        let predictor = predictor(&config);
        let sim = DaySimulator::new(&predictor, &config);
        let mut rng = SimRng::default();
        let outcome = sim.simulate_day(&[0.0; 96], None, 0.45, &mut rng.0).unwrap();
        assert_eq!(outcome.passes, 1);
    }

    #[test]
    fn out_of_bounds_start_is_clamped() {
        let config = SimulationConfig::default();
        let predictor = predictor(&config);
        let sim = DaySimulator::new(&predictor, &config);
        let mut rng = SimRng::default();
        let outcome = sim.simulate_day(&[0.0; 96], None, 3.4, &mut rng.0).unwrap();
        assert_eq!(outcome.series.starting_water_level, 2.6);
        assert!(outcome.water_levels().iter().all(|l| (0.1..=2.6).contains(l)));
    }

    #[test]
    fn low_start_is_lifted_to_the_rated_floor() {
        // with no rain the daily change is clamped so start + change = 0.2
        let config = SimulationConfig {
            jitter_std: 0.0,
            ..SimulationConfig::default()
        };
        let predictor = predictor(&config);
        let sim = DaySimulator::new(&predictor, &config);
        let mut rng = SimRng::from_seed_u64(4);
        let outcome = sim.simulate_day(&[0.0; 96], None, 0.15, &mut rng.0).unwrap();
        assert!(outcome.flow_rates().iter().all(|f| *f >= 0.0));
        assert!(outcome.water_levels().iter().all(|l| (0.1..=2.6).contains(l)));
    }
}
