//! Loading the six historical sensor exports.

use log::info;
use rfs_core::observation::SensorSeries;
use rfs_core::training::TrainingData;
use rfs_core::SimulationConfig;
use std::path::{Path, PathBuf};

pub const QUARTER_HOURLY_DIR: &str = "Quater_Hourly_Readings";
pub const DAILY_DIR: &str = "Daily_Averages";

/// Paths of the training files, relative to a data directory.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingFiles {
    pub qtr_flow: PathBuf,
    pub qtr_rain: PathBuf,
    pub qtr_level: PathBuf,
    pub daily_flow: PathBuf,
    pub daily_rain: PathBuf,
    pub daily_level: PathBuf,
}

impl TrainingFiles {
    pub fn in_dir<P: AsRef<Path>>(data_dir: P) -> Self {
        let qtr = data_dir.as_ref().join(QUARTER_HOURLY_DIR);
        let daily = data_dir.as_ref().join(DAILY_DIR);
        Self {
            qtr_flow: qtr.join("Quarter_Hourly_Flow_Rate.csv"),
            qtr_rain: qtr.join("Quarter_Hourly_Precipitation.csv"),
            qtr_level: qtr.join("Quarter_Hourly_Level.csv"),
            daily_flow: daily.join("Daily_Mean_Flow_Rate.csv"),
            daily_rain: daily.join("Daily_Precipitation.csv"),
            daily_level: daily.join("Daily_Mean_Level.csv"),
        }
    }

    fn all(&self) -> [&Path; 6] {
        [
            &self.qtr_flow,
            &self.qtr_rain,
            &self.qtr_level,
            &self.daily_flow,
            &self.daily_rain,
            &self.daily_level,
        ]
    }

    /// Read and join every file.
    pub fn load(&self, config: &SimulationConfig) -> anyhow::Result<TrainingData> {
        if let Some(missing) = self.all().iter().find(|p| !p.exists()) {
            anyhow::bail!("training file not found: {}", missing.display());
        }
        let read = |path: &Path| {
            let series = SensorSeries::from_path(path)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
            info!("Read {} readings from {}", series.len(), path.display());
            Ok::<_, anyhow::Error>(series)
        };
        let data = TrainingData::from_series(
            &read(&self.qtr_flow)?,
            &read(&self.qtr_rain)?,
            &read(&self.qtr_level)?,
            &read(&self.daily_flow)?,
            &read(&self.daily_rain)?,
            &read(&self.daily_level)?,
            config.rain_volume_const(),
        )?;
        Ok(data)
    }
}
