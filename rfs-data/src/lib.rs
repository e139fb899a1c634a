//! Output products for synthesized river data.
//!
//! This crate turns a `SimulationOutput` into timestamped quarter-hourly
//! and daily rows and writes them as CSV.

/// Fixed-precision rounding of output values.
pub mod rounding {
    /// Decimal places for rainfall columns, mm
    pub const RAINFALL_DECIMALS: i32 = 1;
    /// Decimal places for flow rate columns, m3/s
    pub const FLOW_DECIMALS: i32 = 3;
    /// Decimal places for water level columns, m
    pub const LEVEL_DECIMALS: i32 = 3;

    /// Round half away from zero to `decimals` places.
    pub fn round_to(value: f64, decimals: i32) -> f64 {
        let factor = 10f64.powi(decimals);
        (value * factor).round() / factor
    }

}

/// Flood stage of a water level against the configured flooding levels.
pub mod flood {
    use rfs_core::SimulationConfig;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum FloodStage {
        Normal,
        /// Farm and marshland flooding
        LowLyingLand,
        /// Property flooding
        Property,
    }

    impl FloodStage {
        pub fn classify(level: f64, config: &SimulationConfig) -> Self {
            if level >= config.property_flooding_level {
                FloodStage::Property
            } else if level >= config.low_lying_land_flooding_level {
                FloodStage::LowLyingLand
            } else {
                FloodStage::Normal
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_classify_thresholds() {
            let config = SimulationConfig::default();
            assert_eq!(FloodStage::classify(0.45, &config), FloodStage::Normal);
            assert_eq!(FloodStage::classify(1.8, &config), FloodStage::LowLyingLand);
            assert_eq!(FloodStage::classify(2.29, &config), FloodStage::LowLyingLand);
            assert_eq!(FloodStage::classify(2.6, &config), FloodStage::Property);
        }

        #[test]
        fn test_stages_are_ordered() {
            assert!(FloodStage::Normal < FloodStage::LowLyingLand);
            assert!(FloodStage::LowLyingLand < FloodStage::Property);
        }
    }
}

/// Timestamped output rows.
pub mod records {
    use crate::flood::FloodStage;
    use crate::rounding::{round_to, FLOW_DECIMALS, LEVEL_DECIMALS, RAINFALL_DECIMALS};
    use chrono::{Duration, NaiveDateTime};
    use rfs_core::{SimulationConfig, SimulationOutput};
    use rfs_utils::dates::{format_date, format_timestamp, sample_interval, timestamps_from};
    use serde::{Deserialize, Serialize};

    /// One simulated sample.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct QuarterHourlyRow {
        pub timestamp: String,
        /// mm
        pub rainfall: f64,
        /// m3/s
        pub dam_inflow: f64,
        /// m3/s
        pub flow_rate: f64,
        /// m
        pub water_level: f64,
        pub flood_stage: FloodStage,
    }

    /// One simulated day, aggregated from its samples.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct DailyRow {
        pub date: String,
        /// mm
        pub total_rainfall: f64,
        /// m3/s
        pub mean_flow: f64,
        /// m
        pub mean_level: f64,
        /// m
        pub peak_level: f64,
        /// Stage of the day's peak level
        pub flood_stage: FloodStage,
    }

    /// Quarter-hourly rows for every sample, stamped from `start`.
    pub fn quarter_hourly_rows(
        output: &SimulationOutput,
        start: NaiveDateTime,
        config: &SimulationConfig,
    ) -> Vec<QuarterHourlyRow> {
        let step = sample_interval(config.samples_per_day);
        timestamps_from(start, output.len(), step)
            .iter()
            .enumerate()
            .map(|(i, ts)| {
                let level = output.water_levels[i];
                QuarterHourlyRow {
                    timestamp: format_timestamp(ts),
                    rainfall: round_to(output.rainfall[i], RAINFALL_DECIMALS),
                    dam_inflow: round_to(output.dam_inflow[i], FLOW_DECIMALS),
                    flow_rate: round_to(output.flow_rates[i], FLOW_DECIMALS),
                    water_level: round_to(level, LEVEL_DECIMALS),
                    flood_stage: FloodStage::classify(level, config),
                }
            })
            .collect()
    }

    /// Daily aggregates. Means and totals are taken before rounding.
    pub fn daily_rows(
        output: &SimulationOutput,
        start: NaiveDateTime,
        config: &SimulationConfig,
    ) -> Vec<DailyRow> {
        let per_day = config.samples_per_day.max(1);
        let n = per_day as f64;
        output
            .water_levels
            .chunks(per_day)
            .zip(output.flow_rates.chunks(per_day))
            .zip(output.rainfall.chunks(per_day))
            .enumerate()
            .map(|(day, ((levels, flows), rain))| {
                let peak = levels.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                let date = (start + Duration::days(day as i64)).date();
                DailyRow {
                    date: format_date(&date),
                    total_rainfall: round_to(rain.iter().sum(), RAINFALL_DECIMALS),
                    mean_flow: round_to(flows.iter().sum::<f64>() / n, FLOW_DECIMALS),
                    mean_level: round_to(levels.iter().sum::<f64>() / n, LEVEL_DECIMALS),
                    peak_level: round_to(peak, LEVEL_DECIMALS),
                    flood_stage: FloodStage::classify(peak, config),
                }
            })
            .collect()
    }

}

/// CSV writers for the output rows.
pub mod writer {
    use log::info;
    use rfs_core::Result;
    use serde::Serialize;
    use std::io::Write;
    use std::path::Path;

    /// Serialize rows with a header line into any writer.
    pub fn write_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write rows to a file, replacing it if present.
    pub fn write_rows_to_path<T: Serialize, P: AsRef<Path>>(path: P, rows: &[T]) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)?;
        write_rows(file, rows)?;
        info!("Wrote {} rows to {}", rows.len(), path.display());
        Ok(())
    }

}
