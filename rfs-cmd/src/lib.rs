//! Command implementations for RFS CLI.
//!
//! Provides subcommands for fitting the predictors to historical sensor
//! exports, synthesizing river data over a rainfall horizon, and
//! downloading recent rainfall from a KiWIS service.

use clap::Subcommand;

pub mod kiwis;
pub mod rainfall;
pub mod simulate;
pub mod training;

use simulate::{ConfigArgs, RainfallSource, SimulateOutputs};

#[derive(Subcommand)]
pub enum Command {
    /// Fit the flow and level predictors and print their coefficients
    Fit {
        /// Directory holding Quater_Hourly_Readings/ and Daily_Averages/
        #[arg(short = 'd', long, default_value = "data")]
        data_dir: String,

        #[command(flatten)]
        config: ConfigArgs,

        /// Write the fit summary as JSON here instead of stdout
        #[arg(short = 'o', long)]
        output: Option<String>,
    },

    /// Synthesize quarter-hourly river data for a rainfall horizon
    Simulate {
        /// Directory holding Quater_Hourly_Readings/ and Daily_Averages/
        #[arg(short = 'd', long, default_value = "data")]
        data_dir: String,

        #[command(flatten)]
        config: ConfigArgs,

        /// Rainfall CSV with a `rainfall` column (and optional `dam_inflow`, `timestamp`)
        #[arg(short = 'r', long, conflicts_with = "station")]
        rainfall_csv: Option<String>,

        /// Fetch rainfall for this KiWIS station instead of reading a file
        #[arg(long)]
        station: Option<String>,

        /// Days of rainfall to fetch with --station
        #[arg(long, default_value_t = 1)]
        days: usize,

        /// KiWIS endpoint
        #[arg(long, default_value = kiwis::DEFAULT_BASE_URL)]
        kiwis_url: String,

        /// Water level at the start of the first day, m
        #[arg(short = 'l', long, default_value_t = 0.45)]
        starting_level: f64,

        /// Timestamp of the first sample, "YYYY-MM-DD HH:MM:SS"
        #[arg(long)]
        start: Option<String>,

        /// Output path for quarter-hourly rows
        #[arg(short = 'q', long)]
        quarter_hourly_csv: String,

        /// Output path for daily rows
        #[arg(long)]
        daily_csv: Option<String>,
    },

    /// Download recent quarter-hourly rainfall from a KiWIS station
    FetchRainfall {
        #[arg(long, default_value = kiwis::DEFAULT_STATION)]
        station: String,

        /// Number of quarter-hourly samples
        #[arg(short = 'n', long, default_value_t = 96)]
        samples: usize,

        /// KiWIS endpoint
        #[arg(long, default_value = kiwis::DEFAULT_BASE_URL)]
        kiwis_url: String,

        /// Output rainfall CSV
        #[arg(short = 'o', long)]
        output: String,
    },
}

pub async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Fit {
            data_dir,
            config,
            output,
        } => simulate::run_fit(&data_dir, &config, output.as_deref()).await,
        Command::Simulate {
            data_dir,
            config,
            rainfall_csv,
            station,
            days,
            kiwis_url,
            starting_level,
            start,
            quarter_hourly_csv,
            daily_csv,
        } => {
            let source = match (rainfall_csv, station) {
                (Some(path), _) => RainfallSource::File(path),
                (None, Some(station)) => RainfallSource::Kiwis {
                    base_url: kiwis_url,
                    station,
                    days,
                },
                (None, None) => anyhow::bail!("Pass --rainfall-csv or --station"),
            };
            let outputs = SimulateOutputs {
                quarter_hourly_csv,
                daily_csv,
            };
            simulate::run_simulate(
                &data_dir,
                &config,
                &source,
                starting_level,
                start.as_deref(),
                &outputs,
            )
            .await
        }
        Command::FetchRainfall {
            station,
            samples,
            kiwis_url,
            output,
        } => simulate::run_fetch_rainfall(&kiwis_url, &station, samples, &output).await,
    }
}
