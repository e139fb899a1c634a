use crate::error::{Result, RfsError};
use serde::{Deserialize, Serialize};

/// One quarter-hour timestep of a simulated day.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sample {
    /// Rainfall depth over the catchment, mm
    pub rainfall: f64,
    /// Flow rate, m3/s
    pub flow_rate: f64,
    /// Water level, m
    pub water_level: f64,
    /// Water released into the river from upstream dams, m3/s
    pub dam_inflow: f64,
}

/// One simulated day: the ordered samples plus the level the day starts from.
///
/// Rainfall and dam inflow are fixed at construction; only flow rate and
/// water level are rewritten while the day is being refined.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySeries {
    pub samples: Vec<Sample>,
    pub starting_water_level: f64,
    pub catchment_area_km2: f64,
}

impl DaySeries {
    /// Build a day from its forcing.
    ///
    /// `dam_inflow` of `None` means no dam release. Both sequences must hold
    /// exactly `samples_per_day` finite, non-negative values.
    pub fn new(
        rainfall: &[f64],
        dam_inflow: Option<&[f64]>,
        starting_water_level: f64,
        catchment_area_km2: f64,
        samples_per_day: usize,
    ) -> Result<Self> {
        check_forcing("rainfall", rainfall, samples_per_day)?;
        if let Some(inflow) = dam_inflow {
            check_forcing("dam_inflow", inflow, samples_per_day)?;
        }
        if !starting_water_level.is_finite() {
            return Err(RfsError::InvalidInput(format!(
                "starting water level must be finite, got {}",
                starting_water_level
            )));
        }

        let samples = rainfall
            .iter()
            .enumerate()
            .map(|(i, &rain)| Sample {
                rainfall: rain,
                flow_rate: 0.0,
                water_level: starting_water_level,
                dam_inflow: dam_inflow.map_or(0.0, |inflow| inflow[i]),
            })
            .collect();

        Ok(Self {
            samples,
            starting_water_level,
            catchment_area_km2,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn flow_rates(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.flow_rate).collect()
    }

    pub fn water_levels(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.water_level).collect()
    }

    /// Level at the end of the day, the seed for the following day.
    pub fn final_level(&self) -> f64 {
        self.samples
            .last()
            .map_or(self.starting_water_level, |s| s.water_level)
    }
}

/// Flow and level sequences of a whole horizon, in sample order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationOutput {
    pub rainfall: Vec<f64>,
    pub dam_inflow: Vec<f64>,
    pub flow_rates: Vec<f64>,
    pub water_levels: Vec<f64>,
    /// Level at the end of each simulated day
    pub day_final_levels: Vec<f64>,
}

impl SimulationOutput {
    pub fn with_capacity(samples: usize, days: usize) -> Self {
        Self {
            rainfall: Vec::with_capacity(samples),
            dam_inflow: Vec::with_capacity(samples),
            flow_rates: Vec::with_capacity(samples),
            water_levels: Vec::with_capacity(samples),
            day_final_levels: Vec::with_capacity(days),
        }
    }

    /// Append one finished day.
    pub fn push_day(&mut self, day: &DaySeries) {
        for s in &day.samples {
            self.rainfall.push(s.rainfall);
            self.dam_inflow.push(s.dam_inflow);
            self.flow_rates.push(s.flow_rate);
            self.water_levels.push(s.water_level);
        }
        self.day_final_levels.push(day.final_level());
    }

    pub fn len(&self) -> usize {
        self.water_levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.water_levels.is_empty()
    }

    pub fn days(&self) -> usize {
        self.day_final_levels.len()
    }
}

fn check_forcing(what: &'static str, values: &[f64], expected: usize) -> Result<()> {
    if values.len() != expected {
        return Err(RfsError::InputShape {
            what,
            expected,
            found: values.len(),
        });
    }
    if let Some((i, v)) = values
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || **v < 0.0)
    {
        return Err(RfsError::InvalidInput(format!(
            "{} sample {} is {}; values must be finite and non-negative",
            what, i, v
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_day_with_default_dam_inflow() {
        let day = DaySeries::new(&[1.0, 2.0, 0.0], None, 0.5, 58.5, 3).unwrap();
        assert_eq!(day.len(), 3);
        assert!(day.samples.iter().all(|s| s.dam_inflow == 0.0));
        assert_eq!(day.water_levels(), vec![0.5, 0.5, 0.5]);
        assert_eq!(day.final_level(), 0.5);
    }

    #[test]
    fn keeps_dam_inflow_per_sample() {
        let day = DaySeries::new(&[0.0, 0.0], Some(&[3.0, 4.0]), 0.5, 58.5, 2).unwrap();
        assert_eq!(day.samples[1].dam_inflow, 4.0);
    }

    #[test]
    fn rejects_short_rainfall() {
        let result = DaySeries::new(&[0.0; 95], None, 0.5, 58.5, 96);
        match result {
            Err(RfsError::InputShape { what, expected, found }) => {
                assert_eq!(what, "rainfall");
                assert_eq!(expected, 96);
                assert_eq!(found, 95);
            }
            other => panic!("expected InputShape, got {:?}", other),
        }
    }

    #[test]
    fn rejects_mismatched_dam_inflow() {
        let result = DaySeries::new(&[0.0; 4], Some(&[0.0; 3]), 0.5, 58.5, 4);
        assert!(matches!(
            result,
            Err(RfsError::InputShape { what: "dam_inflow", .. })
        ));
    }

    #[test]
    fn rejects_negative_rainfall() {
        let result = DaySeries::new(&[0.0, -1.0], None, 0.5, 58.5, 2);
        assert!(matches!(result, Err(RfsError::InvalidInput(_))));
    }

    #[test]
    fn output_collects_days_in_order() {
        let mut first = DaySeries::new(&[0.0, 1.0], None, 0.5, 58.5, 2).unwrap();
        first.samples[1].water_level = 0.6;
        let second = DaySeries::new(&[2.0, 3.0], None, 0.6, 58.5, 2).unwrap();
        let mut output = SimulationOutput::with_capacity(4, 2);
        output.push_day(&first);
        output.push_day(&second);
        assert_eq!(output.len(), 4);
        assert_eq!(output.days(), 2);
        assert_eq!(output.rainfall, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(output.day_final_levels, vec![0.6, 0.6]);
    }

    #[test]
    fn rejects_nan_starting_level() {
        let result = DaySeries::new(&[0.0, 0.0], None, f64::NAN, 58.5, 2);
        assert!(matches!(result, Err(RfsError::InvalidInput(_))));
    }
}
