use crate::error::Result;
use csv::{ReaderBuilder, StringRecord};
use log::debug;
use std::collections::HashMap;

/// Field delimiter of the sensor exports.
pub const SENSOR_DELIMITER: u8 = b';';

/// Header of the timestamp column in the sensor exports.
pub const TIMESTAMP_COLUMN: &str = "#Timestamp";

/// A single reading from a sensor export.
///
/// `value` is `None` when the export left the field empty or wrote a
/// non-numeric placeholder; such rows are dropped when series are joined.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: String,
    pub value: Option<f64>,
}

/// One sensor time series (flow, rainfall or level) in file order.
///
/// Exports carry `#Timestamp;Value;Quality Code`; the quality code is
/// discarded.
///
/// ```text
/// #Timestamp;Value;Quality Code
/// 2019-01-01 00:00:00;1.204;254
/// 2019-01-01 00:15:00;;255
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorSeries {
    pub readings: Vec<Reading>,
}

impl SensorSeries {
    /// Parse a semicolon-delimited sensor export.
    pub fn parse(csv_data: &str) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(SENSOR_DELIMITER)
            .has_headers(true)
            .flexible(true)
            .from_reader(csv_data.as_bytes());

        let mut readings = Vec::new();
        for row in rdr.records() {
            let record = row?;
            if let Some(reading) = record_to_reading(&record) {
                readings.push(reading);
            }
        }
        debug!("parsed {} sensor readings", readings.len());
        Ok(Self { readings })
    }

    /// Read and parse a sensor export from disk.
    pub fn from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Index the numeric readings by timestamp, keeping every duplicate in
    /// file order. Missing values are left out.
    pub fn value_map(&self) -> HashMap<&str, Vec<f64>> {
        let mut map: HashMap<&str, Vec<f64>> = HashMap::new();
        for r in &self.readings {
            if let Some(v) = r.value {
                map.entry(r.timestamp.as_str()).or_default().push(v);
            }
        }
        map
    }
}

fn record_to_reading(record: &StringRecord) -> Option<Reading> {
    let timestamp = record.get(0)?.trim();
    if timestamp.is_empty() {
        return None;
    }
    let value = record
        .get(1)
        .map(str::trim)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite());
    Some(Reading {
        timestamp: timestamp.to_string(),
        value,
    })
}

/// Inner-join three series on timestamp, keeping the order of `first`.
///
/// Rows where any series is missing or non-numeric are dropped. A timestamp
/// repeated within a series yields every combination of its readings, so
/// the result holds the same rows whatever the argument order.
pub fn inner_join3(
    first: &SensorSeries,
    second: &SensorSeries,
    third: &SensorSeries,
) -> Vec<(String, f64, f64, f64)> {
    let second_values = second.value_map();
    let third_values = third.value_map();
    let mut joined = Vec::new();
    for r in &first.readings {
        let (Some(a), Some(bs), Some(cs)) = (
            r.value,
            second_values.get(r.timestamp.as_str()),
            third_values.get(r.timestamp.as_str()),
        ) else {
            continue;
        };
        for &b in bs {
            for &c in cs {
                joined.push((r.timestamp.clone(), a, b, c));
            }
        }
    }
    joined
}
