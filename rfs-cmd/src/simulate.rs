//! Fit, simulate and fetch-rainfall commands.

use crate::kiwis::KiwisClient;
use crate::rainfall::{read_rainfall_path, write_rainfall_path, RainfallSeries};
use crate::training::TrainingFiles;
use chrono::NaiveDateTime;
use clap::Args;
use log::{info, warn};
use rfs_core::{Forcing, SimulationConfig};
use rfs_data::records::{daily_rows, quarter_hourly_rows};
use rfs_data::writer::write_rows_to_path;
use rfs_model::{simulate_horizon, FitReport, Predictor, SimRng};
use rfs_utils::dates::parse_timestamp;
use std::path::Path;

/// Config file plus the flags that override it.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// JSON config file; missing fields take their defaults
    #[arg(short = 'c', long)]
    pub config: Option<String>,

    /// Seed of the simulation random stream
    #[arg(long)]
    pub seed: Option<u64>,

    /// Refinement passes per simulated day
    #[arg(long)]
    pub passes: Option<usize>,

    /// Stop a day early once a pass changes no level by more than this, m
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Catchment area, km2
    #[arg(long)]
    pub catchment_area: Option<f64>,
}

impl ConfigArgs {
    pub fn resolve(&self) -> anyhow::Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_json_file(path)
                .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path, e))?,
            None => SimulationConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(passes) = self.passes {
            config.refinement_passes = passes;
        }
        if self.tolerance.is_some() {
            config.convergence_tolerance = self.tolerance;
        }
        if let Some(area) = self.catchment_area {
            config.catchment_area_km2 = area;
        }
        config.validate()?;
        Ok(config)
    }
}

fn train(data_dir: &str, config: &SimulationConfig) -> anyhow::Result<(Predictor, FitReport)> {
    let data = TrainingFiles::in_dir(data_dir).load(config)?;
    let (predictor, report) = Predictor::train(&data, config)?;
    Ok((predictor, report))
}

fn coefficients_json(predictor: &Predictor, report: &FitReport) -> serde_json::Value {
    serde_json::json!({
        "flow_curve": {
            "coefficients": predictor.flow_curve().rating().coefficients(),
            "offset": predictor.flow_curve().offset(),
            "rows": report.flow_rows,
        },
        "level_derivative_curve": {
            "coefficients": predictor.level_curve().line().coefficients(),
            "residual_std": report.residual_std,
            "rows": report.level_rows,
            "outliers": report.level_outliers,
        },
    })
}

/// Fit both predictors and report how well they validate.
pub async fn run_fit(
    data_dir: &str,
    config_args: &ConfigArgs,
    output: Option<&str>,
) -> anyhow::Result<()> {
    let config = config_args.resolve()?;
    let (predictor, report) = train(data_dir, &config)?;
    let summary = coefficients_json(&predictor, &report);
    match output {
        Some(path) => {
            std::fs::write(path, serde_json::to_string_pretty(&summary)?)?;
            info!("Fit summary written to {}", path);
        }
        None => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}

/// Where the simulated horizon's rainfall comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum RainfallSource {
    File(String),
    Kiwis {
        base_url: String,
        station: String,
        days: usize,
    },
}

async fn load_rainfall(
    source: &RainfallSource,
    config: &SimulationConfig,
) -> anyhow::Result<RainfallSeries> {
    match source {
        RainfallSource::File(path) => read_rainfall_path(path),
        RainfallSource::Kiwis {
            base_url,
            station,
            days,
        } => {
            let client = KiwisClient::new(base_url)?;
            let fetched = client
                .fetch_rainfall(station, days * config.samples_per_day)
                .await?;
            Ok(RainfallSeries {
                start: fetched.timestamps.first().copied(),
                forcing: Forcing::new(fetched.values, None)?,
            })
        }
    }
}

/// Output file paths of a simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulateOutputs {
    pub quarter_hourly_csv: String,
    pub daily_csv: Option<String>,
}

/// Train, simulate the rainfall horizon day by day, and write the results.
pub async fn run_simulate(
    data_dir: &str,
    config_args: &ConfigArgs,
    source: &RainfallSource,
    starting_level: f64,
    start: Option<&str>,
    outputs: &SimulateOutputs,
) -> anyhow::Result<()> {
    let config = config_args.resolve()?;
    let (predictor, _report) = train(data_dir, &config)?;
    let rainfall = load_rainfall(source, &config).await?;

    let start = resolve_start(start, rainfall.start)?;
    if starting_level < config.level_floor || starting_level > config.level_ceiling {
        warn!(
            "Starting level {} m is outside [{}, {}] and will be clamped",
            starting_level, config.level_floor, config.level_ceiling
        );
    }

    let forcing = rainfall.forcing;
    let sim_config = config.clone();
    let output = tokio::task::spawn_blocking(move || {
        let mut rng = SimRng::from_seed_u64(sim_config.seed);
        simulate_horizon(&predictor, &sim_config, &forcing, starting_level, &mut rng.0)
    })
    .await??;

    write_outputs(&output, start, &config, outputs)?;
    Ok(())
}

fn resolve_start(
    flag: Option<&str>,
    from_rainfall: Option<NaiveDateTime>,
) -> anyhow::Result<NaiveDateTime> {
    match (flag, from_rainfall) {
        (Some(ts), _) => parse_timestamp(ts),
        (None, Some(ts)) => Ok(ts),
        (None, None) => anyhow::bail!("No start time: pass --start or a rainfall file with timestamps"),
    }
}

fn write_outputs(
    output: &rfs_core::SimulationOutput,
    start: NaiveDateTime,
    config: &SimulationConfig,
    outputs: &SimulateOutputs,
) -> anyhow::Result<()> {
    let rows = quarter_hourly_rows(output, start, config);
    write_rows_to_path(&outputs.quarter_hourly_csv, &rows)?;
    if let Some(daily_csv) = &outputs.daily_csv {
        let rows = daily_rows(output, start, config);
        write_rows_to_path(daily_csv, &rows)?;
    }
    Ok(())
}

/// Download recent rainfall and save it as a rainfall file.
pub async fn run_fetch_rainfall(
    base_url: &str,
    station: &str,
    samples: usize,
    output: &str,
) -> anyhow::Result<()> {
    let client = KiwisClient::new(base_url)?;
    let fetched = client.fetch_rainfall(station, samples).await?;
    write_rainfall_path(Path::new(output), &fetched.values, Some(&fetched.timestamps))?;
    Ok(())
}
