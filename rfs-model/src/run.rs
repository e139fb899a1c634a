use crate::predictor::Predictor;
use crate::simulator::DaySimulator;
use log::{debug, info};
use rand::Rng;
use rfs_core::{Forcing, Result, RfsError, SimulationConfig, SimulationOutput};

/// Run the model over a whole forcing horizon.
///
/// Days are simulated strictly in order: each day starts from the final
/// level of the one before it, and `starting_level` seeds the first day.
/// The horizon must hold a whole number of days.
pub fn simulate_horizon<R: Rng + ?Sized>(
    predictor: &Predictor,
    config: &SimulationConfig,
    forcing: &Forcing,
    starting_level: f64,
    rng: &mut R,
) -> Result<SimulationOutput> {
    config.validate()?;
    let per_day = config.samples_per_day;
    if forcing.len() % per_day != 0 {
        return Err(RfsError::InputShape {
            what: "rainfall",
            expected: (forcing.len() / per_day + 1) * per_day,
            found: forcing.len(),
        });
    }
    let days = forcing.len() / per_day;

    let simulator = DaySimulator::new(predictor, config);
    let mut output = SimulationOutput::with_capacity(forcing.len(), days);
    let mut level = starting_level;

    for index in 0..days {
        let (rainfall, dam_inflow) = forcing.day(index, per_day).ok_or_else(|| RfsError::InputShape {
            what: "rainfall",
            expected: (index + 1) * per_day,
            found: forcing.len(),
        })?;
        let outcome = simulator.simulate_day(rainfall, dam_inflow, level, rng)?;
        debug!(
            "day {}: level {:.3} -> {:.3} m after {} passes",
            index + 1,
            outcome.series.starting_water_level,
            outcome.final_level(),
            outcome.passes
        );
        level = outcome.final_level();
        output.push_day(&outcome.series);
    }

    info!(
        "simulated {} days ({} samples), final level {:.3} m",
        days,
        output.len(),
        level
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::{FlowCurve, LevelDerivativeCurve};
    use crate::regression::Polynomial;
    use crate::rng::SimRng;

    fn predictor(config: &SimulationConfig) -> Predictor {
        let flow = FlowCurve::new(Polynomial::new(vec![2.0, 8.0, 6.0]), config).unwrap();
        let level = LevelDerivativeCurve::new(Polynomial::new(vec![0.0, 1e-7]), 0.002).unwrap();
        Predictor::from_curves(flow, level)
    }

    #[test]
    fn partial_day_is_rejected() {
        let config = SimulationConfig::default();
        let predictor = predictor(&config);
        let forcing = Forcing::new(vec![0.0; 100], None).unwrap();
        let mut rng = SimRng::default();
        let result = simulate_horizon(&predictor, &config, &forcing, 0.45, &mut rng.0);
        assert!(matches!(
            result,
            Err(RfsError::InputShape { expected: 192, found: 100, .. })
        ));
    }

    #[test]
    fn collects_every_day() {
        let config = SimulationConfig::default();
        let predictor = predictor(&config);
        let forcing = Forcing::new(vec![0.1; 96 * 3], None).unwrap();
        let mut rng = SimRng::default();
        let output = simulate_horizon(&predictor, &config, &forcing, 0.45, &mut rng.0).unwrap();
        assert_eq!(output.len(), 288);
        assert_eq!(output.days(), 3);
        assert_eq!(output.day_final_levels[2], output.water_levels[287]);
        assert!(output.dam_inflow.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn each_day_starts_where_the_last_ended() {
        let config = SimulationConfig::default();
        let predictor = predictor(&config);
        let forcing = Forcing::new(vec![0.0; 96 * 2], None).unwrap();
        let mut rng = SimRng::default();
        let output = simulate_horizon(&predictor, &config, &forcing, 0.45, &mut rng.0).unwrap();
        assert_eq!(output.water_levels[96], output.day_final_levels[0]);
    }
}
