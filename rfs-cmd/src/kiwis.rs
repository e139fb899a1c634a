//! Rainfall from a KiWIS time-series web service.
//!
//! Two requests per fetch: `getTimeseriesList` for the station, to find the
//! 15-minute precipitation total series, then `getTimeseriesValues` for that
//! series over a trailing period long enough to cover the samples.

use chrono::NaiveDateTime;
use log::{info, warn};
use rfs_utils::dates::parse_timestamp;
use serde_json::Value;

pub const DEFAULT_BASE_URL: &str = "https://timeseries.sepa.org.uk/KiWIS/KiWIS";
pub const DEFAULT_STATION: &str = "Dippen";

const TS_ID_COLUMN: usize = 3;
const TS_NAME_COLUMN: usize = 4;
const PARAMETER_COLUMN: usize = 6;
const PRECIP_TS_NAME: &str = "15minute.Total";
const PRECIP_PARAMETER: &str = "Precip";

/// Rainfall samples with their timestamps, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedRainfall {
    pub timestamps: Vec<NaiveDateTime>,
    /// mm per sample
    pub values: Vec<f64>,
}

pub struct KiwisClient {
    client: reqwest::Client,
    base_url: String,
}

impl KiwisClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, query: &[(&str, &str)]) -> anyhow::Result<Value> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("service", "kisters"),
                ("type", "queryServices"),
                ("datasource", "0"),
                ("format", "json"),
            ])
            .query(query)
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("KiWIS request failed: {}", response.status());
        }
        Ok(response.json::<Value>().await?)
    }

    /// Id of the station's 15-minute precipitation total series.
    pub async fn precipitation_series_id(&self, station: &str) -> anyhow::Result<String> {
        let list = self
            .get_json(&[("request", "getTimeseriesList"), ("station_name", station)])
            .await?;
        find_precipitation_series(&list)
            .ok_or_else(|| anyhow::anyhow!("No {} precipitation series for {}", PRECIP_TS_NAME, station))
    }

    /// The first `samples` quarter-hourly rainfall values of the trailing
    /// `period_for(samples)` window.
    pub async fn fetch_rainfall(&self, station: &str, samples: usize) -> anyhow::Result<FetchedRainfall> {
        let ts_id = self.precipitation_series_id(station).await?;
        let period = period_for(samples);
        info!("Fetching {} samples of series {} ({}) for {}", samples, ts_id, period, station);
        let values = self
            .get_json(&[
                ("request", "getTimeseriesValues"),
                ("ts_id", ts_id.as_str()),
                ("period", period.as_str()),
                ("returnfields", "Timestamp,Value,Quality Code"),
            ])
            .await?;
        parse_values(&values, samples)
    }
}

/// ISO 8601 period of `samples / 4 + 4` hours.
pub fn period_for(samples: usize) -> String {
    format!("P{}H", samples / 4 + 4)
}

fn cell_str(cell: &Value) -> Option<String> {
    match cell {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Find the ts_id in a `getTimeseriesList` response.
///
/// The response is an array of rows whose first row is the header.
pub fn find_precipitation_series(list: &Value) -> Option<String> {
    list.as_array()?.iter().skip(1).find_map(|row| {
        let row = row.as_array()?;
        let ts_name = row.get(TS_NAME_COLUMN)?.as_str()?;
        let parameter = row.get(PARAMETER_COLUMN)?.as_str()?;
        if ts_name == PRECIP_TS_NAME && parameter == PRECIP_PARAMETER {
            cell_str(row.get(TS_ID_COLUMN)?)
        } else {
            None
        }
    })
}

/// Take the first `samples` values of a `getTimeseriesValues` response.
///
/// Null or non-numeric values become 0 mm. A short response is padded with
/// zeros, one quarter hour apart.
pub fn parse_values(response: &Value, samples: usize) -> anyhow::Result<FetchedRainfall> {
    let rows = response
        .get(0)
        .and_then(|series| series.get("data"))
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow::anyhow!("KiWIS response has no data array"))?;

    let mut timestamps = Vec::with_capacity(samples);
    let mut values = Vec::with_capacity(samples);
    let mut missing = 0;
    for row in rows.iter().take(samples) {
        let ts = row
            .get(0)
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("KiWIS row without timestamp: {}", row))?;
        timestamps.push(parse_timestamp(ts)?);
        let value = row.get(1).and_then(Value::as_f64).filter(|v| v.is_finite());
        if value.is_none() {
            missing += 1;
        }
        values.push(value.unwrap_or(0.0).max(0.0));
    }
    if missing > 0 {
        warn!("{} missing rainfall values set to 0 mm", missing);
    }

    if values.len() < samples {
        warn!("KiWIS returned {} of {} samples; padding with 0 mm", values.len(), samples);
        let step = chrono::Duration::minutes(rfs_utils::dates::QUARTER_HOUR_MINUTES);
        while values.len() < samples {
            let next = timestamps.last().map(|t| *t + step);
            match next {
                Some(t) => timestamps.push(t),
                None => anyhow::bail!("KiWIS returned no rainfall values"),
            }
            values.push(0.0);
        }
    }
    Ok(FetchedRainfall { timestamps, values })
}
