//! Joined historical datasets used to fit the predictors.

use crate::error::{Result, RfsError};
use crate::observation::{inner_join3, SensorSeries};
use crate::SECONDS_PER_DAY;
use log::info;

/// One aligned quarter-hourly training row.
#[derive(Debug, Clone, PartialEq)]
pub struct QuarterHourlyRecord {
    pub timestamp: String,
    /// m3/s
    pub flow_rate: f64,
    /// mm
    pub rainfall: f64,
    /// m
    pub water_level: f64,
}

/// One aligned daily training row with its derived water-balance columns.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub timestamp: String,
    /// m3/s
    pub mean_flow: f64,
    /// mm
    pub total_rainfall: f64,
    /// m
    pub mean_level: f64,
    /// Rain-derived inflow minus outflow over the day, m3
    pub water_difference: f64,
    /// Mean level of the next day minus this day's; 0 for the last day
    pub level_derivative: f64,
}

/// Both historical datasets, already joined and cleaned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingData {
    pub quarter_hourly: Vec<QuarterHourlyRecord>,
    pub daily: Vec<DailyRecord>,
}

impl TrainingData {
    /// Join the six sensor series and derive the daily water balance.
    ///
    /// `rain_volume_const` is the m3 of river inflow per mm of catchment
    /// rainfall (see `SimulationConfig::rain_volume_const`).
    pub fn from_series(
        qtr_flow: &SensorSeries,
        qtr_rain: &SensorSeries,
        qtr_level: &SensorSeries,
        daily_flow: &SensorSeries,
        daily_rain: &SensorSeries,
        daily_level: &SensorSeries,
        rain_volume_const: f64,
    ) -> Result<Self> {
        let quarter_hourly = inner_join3(qtr_flow, qtr_rain, qtr_level)
            .into_iter()
            .map(|(timestamp, flow_rate, rainfall, water_level)| QuarterHourlyRecord {
                timestamp,
                flow_rate,
                rainfall,
                water_level,
            })
            .collect::<Vec<_>>();
        if quarter_hourly.is_empty() {
            return Err(RfsError::TrainingData(
                "quarter-hourly join produced no complete rows".into(),
            ));
        }

        let joined_daily = inner_join3(daily_flow, daily_rain, daily_level);
        if joined_daily.is_empty() {
            return Err(RfsError::TrainingData(
                "daily join produced no complete rows".into(),
            ));
        }
        let daily = derive_daily(joined_daily, rain_volume_const);

        info!(
            "training data: {} quarter-hourly rows, {} daily rows",
            quarter_hourly.len(),
            daily.len()
        );
        Ok(Self {
            quarter_hourly,
            daily,
        })
    }
}

/// Compute water difference and level derivative for consecutive joined days.
pub fn derive_daily(joined: Vec<(String, f64, f64, f64)>, rain_volume_const: f64) -> Vec<DailyRecord> {
    let next_levels = joined
        .iter()
        .skip(1)
        .map(|(_, _, _, level)| Some(*level))
        .chain(std::iter::once(None))
        .collect::<Vec<_>>();

    joined
        .into_iter()
        .zip(next_levels)
        .map(|((timestamp, mean_flow, total_rainfall, mean_level), next)| DailyRecord {
            timestamp,
            mean_flow,
            total_rainfall,
            mean_level,
            water_difference: total_rainfall * rain_volume_const - mean_flow * SECONDS_PER_DAY,
            level_derivative: next.map_or(0.0, |n| n - mean_level),
        })
        .collect()
}
