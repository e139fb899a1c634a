//! Local rainfall forcing files.
//!
//! Comma-delimited with a header; `rainfall` is required, `dam_inflow` and
//! `timestamp` are optional:
//!
//! ```text
//! timestamp,rainfall,dam_inflow
//! 2021-02-01 00:00:00,0.4,0.0
//! ```

use chrono::NaiveDateTime;
use log::info;
use rfs_core::Forcing;
use rfs_utils::dates::{format_timestamp, parse_timestamp};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RainfallRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// mm per sample
    pub rainfall: f64,
    /// m3/s
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dam_inflow: Option<f64>,
}

/// Rainfall for a horizon plus the time of its first sample, if known.
#[derive(Debug, Clone, PartialEq)]
pub struct RainfallSeries {
    pub start: Option<NaiveDateTime>,
    pub forcing: Forcing,
}

/// Read a rainfall file from any reader.
///
/// A `dam_inflow` column is used only when every row fills it.
pub fn read_rainfall<R: Read>(reader: R) -> anyhow::Result<RainfallSeries> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: RainfallRecord = result?;
        records.push(record);
    }
    if records.is_empty() {
        anyhow::bail!("rainfall file has no rows");
    }

    let start = match records[0].timestamp.as_deref() {
        Some(ts) => Some(parse_timestamp(ts)?),
        None => None,
    };
    let rainfall = records.iter().map(|r| r.rainfall).collect::<Vec<_>>();
    let dam_inflow = records
        .iter()
        .map(|r| r.dam_inflow)
        .collect::<Option<Vec<_>>>();
    let forcing = Forcing::new(rainfall, dam_inflow)?;
    Ok(RainfallSeries { start, forcing })
}

pub fn read_rainfall_path<P: AsRef<Path>>(path: P) -> anyhow::Result<RainfallSeries> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", path.display(), e))?;
    let series = read_rainfall(file)?;
    info!("Read {} rainfall samples from {}", series.forcing.len(), path.display());
    Ok(series)
}

/// Write rainfall samples, stamping them from `start` when given.
pub fn write_rainfall_path<P: AsRef<Path>>(
    path: P,
    rainfall: &[f64],
    timestamps: Option<&[NaiveDateTime]>,
) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path.as_ref())?;
    for (i, value) in rainfall.iter().enumerate() {
        wtr.serialize(RainfallRecord {
            timestamp: timestamps.and_then(|ts| ts.get(i)).map(format_timestamp),
            rainfall: *value,
            dam_inflow: None,
        })?;
    }
    wtr.flush()?;
    info!("Wrote {} rainfall samples to {}", rainfall.len(), path.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rainfall_only() {
        let text = "rainfall\n0.0\n0.4\n1.2\n";
        let series = read_rainfall(text.as_bytes()).unwrap();
        assert_eq!(series.start, None);
        assert_eq!(series.forcing.rainfall, vec![0.0, 0.4, 1.2]);
        assert_eq!(series.forcing.dam_inflow, None);
    }

    #[test]
    fn test_with_timestamp_and_dam() {
        let text = "timestamp,rainfall,dam_inflow\n\
                    2021-02-01 00:00:00,0.4,1.5\n\
                    2021-02-01 00:15:00,0.0,1.5\n";
        let series = read_rainfall(text.as_bytes()).unwrap();
        assert_eq!(
            series.start.map(|ts| format_timestamp(&ts)),
            Some("2021-02-01 00:00:00".to_string())
        );
        assert_eq!(series.forcing.dam_inflow, Some(vec![1.5, 1.5]));
    }

    #[test]
    fn test_partial_dam_column_is_ignored() {
        let text = "rainfall,dam_inflow\n0.4,1.5\n0.0,\n";
        let series = read_rainfall(text.as_bytes()).unwrap();
        assert_eq!(series.forcing.dam_inflow, None);
    }

    #[test]
    fn test_negative_rainfall_is_rejected() {
        let text = "rainfall\n0.4\n-1.0\n";
        assert!(read_rainfall(text.as_bytes()).is_err());
    }

    #[test]
    fn test_empty_file_is_rejected() {
        assert!(read_rainfall("rainfall\n".as_bytes()).is_err());
    }

    #[test]
    fn test_write_then_read_keeps_start() {
        let path = std::env::temp_dir().join(format!("rfs-rain-{}.csv", std::process::id()));
        let start = parse_timestamp("2021-02-01 06:00:00").unwrap();
        let stamps = rfs_utils::dates::timestamps_from(start, 3, chrono::Duration::minutes(15));
        write_rainfall_path(&path, &[0.2, 0.0, 0.6], Some(&stamps)).unwrap();
        let series = read_rainfall_path(&path).unwrap();
        assert_eq!(series.start, Some(start));
        assert_eq!(series.forcing.rainfall, vec![0.2, 0.0, 0.6]);
        let _ = std::fs::remove_file(&path);
    }
}
