//! End-to-end behaviour of the day loop and the multi-day chain.

use rand::Rng;
use rfs_core::observation::SensorSeries;
use rfs_core::training::TrainingData;
use rfs_core::{Forcing, SimulationConfig};
use rfs_model::regression::Polynomial;
use rfs_model::{
    simulate_horizon, DaySimulator, FlowCurve, LevelDerivativeCurve, Predictor, SimRng,
};

/// Rating curve 2 + 8L + 6L^2 and a 1e-7 m per m3 level response.
fn reference_predictor(config: &SimulationConfig) -> Predictor {
    let flow = FlowCurve::new(Polynomial::new(vec![2.0, 8.0, 6.0]), config).unwrap();
    let level = LevelDerivativeCurve::new(Polynomial::new(vec![0.0, 1e-7]), 0.002).unwrap();
    Predictor::from_curves(flow, level)
}

fn within_bounds(levels: &[f64]) -> bool {
    levels.iter().all(|l| (0.1..=2.6).contains(l))
}

#[test]
fn dry_day_only_drains() {
    let config = SimulationConfig {
        jitter_std: 0.0,
        ..SimulationConfig::default()
    };
    let predictor = reference_predictor(&config);
    let simulator = DaySimulator::new(&predictor, &config);
    let mut rng = SimRng::from_seed_u64(1);

    let outcome = simulator
        .simulate_day(&[0.0; 96], Some(&[0.0; 96]), 0.45, &mut rng.0)
        .unwrap();

    let differences = simulator.water_differences(&outcome.series);
    assert!(differences.iter().all(|wd| *wd <= 0.0));

    let levels = outcome.water_levels();
    assert_eq!(levels[0], 0.45);
    assert!(levels.windows(2).all(|w| w[1] <= w[0]));
    assert!(outcome.final_level() < 0.45);
    assert!(within_bounds(&levels));
}

#[test]
fn long_drought_reaches_the_low_flow_floor() {
    let config = SimulationConfig::default();
    let predictor = reference_predictor(&config);
    let forcing = Forcing::new(vec![0.0; 96 * 20], None).unwrap();
    let mut rng = SimRng::from_seed_u64(2);

    let output = simulate_horizon(&predictor, &config, &forcing, 0.45, &mut rng.0).unwrap();

    assert!(within_bounds(&output.water_levels));
    assert!(output.flow_rates.iter().all(|f| *f >= 0.0));
    let lowest = output.water_levels.iter().cloned().fold(f64::INFINITY, f64::min);
    assert!(lowest < 0.21);
    for (level, flow) in output.water_levels.iter().zip(&output.flow_rates) {
        if *level <= 0.2 {
            assert!(*flow < 0.1);
        }
    }
}

#[test]
fn heavy_rain_fills_to_the_ceiling() {
    let config = SimulationConfig {
        catchment_area_km2: 58.5,
        ..SimulationConfig::default()
    };
    let predictor = reference_predictor(&config);
    let simulator = DaySimulator::new(&predictor, &config);
    let mut rng = SimRng::from_seed_u64(3);

    let outcome = simulator
        .simulate_day(&[10.0; 96], None, 0.45, &mut rng.0)
        .unwrap();

    let daily: f64 = simulator.water_differences(&outcome.series).iter().sum();
    assert!(daily > 0.0);

    let levels = outcome.water_levels();
    assert!(levels.windows(2).all(|w| w[1] >= w[0]));
    assert_eq!(outcome.final_level(), 2.6);
    assert!(within_bounds(&levels));
}

#[test]
fn same_seed_gives_identical_runs() {
    let config = SimulationConfig::default();
    let predictor = reference_predictor(&config);
    let rainfall: Vec<f64> = (0..96 * 5)
        .map(|i| if (i / 24) % 3 == 0 { 0.8 } else { 0.0 })
        .collect();
    let forcing = Forcing::new(rainfall, None).unwrap();

    let mut first_rng = SimRng::from_seed_u64(77);
    let mut second_rng = SimRng::from_seed_u64(77);
    let first = simulate_horizon(&predictor, &config, &forcing, 0.6, &mut first_rng.0).unwrap();
    let second = simulate_horizon(&predictor, &config, &forcing, 0.6, &mut second_rng.0).unwrap();
    assert_eq!(first, second);

    let mut other_rng = SimRng::from_seed_u64(78);
    let other = simulate_horizon(&predictor, &config, &forcing, 0.6, &mut other_rng.0).unwrap();
    assert_ne!(first.water_levels, other.water_levels);
}

#[test]
fn chained_days_match_back_to_back_single_days() {
    let config = SimulationConfig::default();
    let predictor = reference_predictor(&config);
    let mut rainfall = vec![0.0; 96];
    rainfall.extend(vec![1.5; 96]);
    let forcing = Forcing::new(rainfall.clone(), None).unwrap();

    let mut chain_rng = SimRng::from_seed_u64(9);
    let chained = simulate_horizon(&predictor, &config, &forcing, 0.7, &mut chain_rng.0).unwrap();

    let simulator = DaySimulator::new(&predictor, &config);
    let mut rng = SimRng::from_seed_u64(9);
    let day1 = simulator
        .simulate_day(&rainfall[..96], None, 0.7, &mut rng.0)
        .unwrap();
    let day2 = simulator
        .simulate_day(&rainfall[96..], None, day1.final_level(), &mut rng.0)
        .unwrap();

    let mut levels = day1.water_levels();
    levels.extend(day2.water_levels());
    let mut flows = day1.flow_rates();
    flows.extend(day2.flow_rates());

    assert_eq!(chained.water_levels, levels);
    assert_eq!(chained.flow_rates, flows);
    assert_eq!(chained.day_final_levels, vec![day1.final_level(), day2.final_level()]);
}

#[test]
fn doubling_the_pass_budget_stays_at_noise_scale() {
    // Each pass redraws the daily change, so extra passes do not converge
    // further; they only move the result by about the residual spread.
    let base = SimulationConfig::default();
    let doubled = SimulationConfig {
        refinement_passes: 70,
        ..SimulationConfig::default()
    };
    let predictor = reference_predictor(&base);
    let rainfall = vec![0.2; 96];

    let mut rng = SimRng::from_seed_u64(5);
    let short = DaySimulator::new(&predictor, &base)
        .simulate_day(&rainfall, None, 0.8, &mut rng.0)
        .unwrap();
    let mut rng = SimRng::from_seed_u64(5);
    let long = DaySimulator::new(&predictor, &doubled)
        .simulate_day(&rainfall, None, 0.8, &mut rng.0)
        .unwrap();

    assert_eq!(short.passes, 35);
    assert_eq!(long.passes, 70);
    let max_diff = short
        .water_levels()
        .iter()
        .zip(long.water_levels())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max);
    assert!(max_diff < 0.02, "max level difference {}", max_diff);
}

fn sensor_csv(rows: &[(String, f64)]) -> String {
    let mut text = String::from("#Timestamp;Value;Quality Code\n");
    for (ts, value) in rows {
        text.push_str(&format!("{};{};254\n", ts, value));
    }
    text
}

#[test]
fn trained_predictor_drives_a_week() {
    let config = SimulationConfig::default();
    let rating = |l: f64| 2.0 + 8.0 * l + 6.0 * l * l;
    let mut rng = SimRng::from_seed_u64(21);

    let mut qtr_flow = Vec::new();
    let mut qtr_rain = Vec::new();
    let mut qtr_level = Vec::new();
    for i in 0..800 {
        let ts = format!("2019-01-01 q{:04}", i);
        let level = rng.0.gen_range(0.1..2.4);
        let noise: f64 = rng.0.gen_range(-0.1..0.1);
        qtr_flow.push((ts.clone(), rating(level) + noise));
        qtr_rain.push((ts.clone(), rng.0.gen_range(0.0..2.0)));
        qtr_level.push((ts, level));
    }

    let mut day_flow = Vec::new();
    let mut day_rain = Vec::new();
    let mut day_level = Vec::new();
    let mut level: f64 = 0.6;
    for d in 0..400 {
        let ts = format!("day{:03}", d);
        let flow = rating(level);
        let rain = rng.0.gen_range(0.0..30.0);
        day_flow.push((ts.clone(), flow));
        day_rain.push((ts.clone(), rain));
        day_level.push((ts, level));
        let wd = rain * config.rain_volume_const() - flow * 86_400.0;
        let noise: f64 = rng.0.gen_range(-0.02..0.02);
        level = (level + 1e-7 * wd + noise).clamp(0.25, 1.9);
    }

    let parse = |rows: &[(String, f64)]| SensorSeries::parse(&sensor_csv(rows)).unwrap();
    let data = TrainingData::from_series(
        &parse(&qtr_flow),
        &parse(&qtr_rain),
        &parse(&qtr_level),
        &parse(&day_flow),
        &parse(&day_rain),
        &parse(&day_level),
        config.rain_volume_const(),
    )
    .unwrap();
    let (predictor, report) = Predictor::train(&data, &config).unwrap();
    assert!(report.residual_std > 0.0);
    assert!((predictor.flow_curve().rated(1.0) - rating(1.0)).abs() < 0.1);

    let rainfall: Vec<f64> = (0..96 * 7).map(|i| if i % 96 < 8 { 1.0 } else { 0.0 }).collect();
    let forcing = Forcing::new(rainfall, None).unwrap();
    let mut sim_rng = SimRng::from_seed_u64(config.seed);
    let output = simulate_horizon(&predictor, &config, &forcing, 0.6, &mut sim_rng.0).unwrap();

    assert_eq!(output.days(), 7);
    assert!(within_bounds(&output.water_levels));
    assert!(output.flow_rates.iter().all(|f| f.is_finite()));
}
