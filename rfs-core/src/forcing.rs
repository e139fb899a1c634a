use crate::error::{Result, RfsError};

/// Validated forcing for a whole simulation horizon.
///
/// `rainfall` is in mm per sample and `dam_inflow` in m3/s per sample. A
/// missing dam inflow is treated as zero release everywhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Forcing {
    pub rainfall: Vec<f64>,
    pub dam_inflow: Option<Vec<f64>>,
}

impl Forcing {
    /// Create new Forcing with validation.
    ///
    /// Validates:
    /// - rainfall is non-empty
    /// - dam_inflow, when given, matches the rainfall length
    /// - no NaN, infinite or negative values
    pub fn new(rainfall: Vec<f64>, dam_inflow: Option<Vec<f64>>) -> Result<Self> {
        if rainfall.is_empty() {
            return Err(RfsError::InvalidInput("rainfall sequence is empty".into()));
        }
        if let Some(inflow) = &dam_inflow {
            if inflow.len() != rainfall.len() {
                return Err(RfsError::InputShape {
                    what: "dam_inflow",
                    expected: rainfall.len(),
                    found: inflow.len(),
                });
            }
            reject_invalid("dam_inflow", inflow)?;
        }
        reject_invalid("rainfall", &rainfall)?;
        Ok(Self {
            rainfall,
            dam_inflow,
        })
    }

    /// Number of samples in the horizon.
    pub fn len(&self) -> usize {
        self.rainfall.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rainfall.is_empty()
    }

    /// Rainfall and dam inflow of one day, or `None` past the horizon.
    pub fn day(&self, index: usize, samples_per_day: usize) -> Option<(&[f64], Option<&[f64]>)> {
        let start = index.checked_mul(samples_per_day)?;
        let end = start.checked_add(samples_per_day)?;
        if end > self.len() {
            return None;
        }
        let inflow = self.dam_inflow.as_ref().map(|v| &v[start..end]);
        Some((&self.rainfall[start..end], inflow))
    }
}

fn reject_invalid(what: &str, values: &[f64]) -> Result<()> {
    if values.iter().any(|v| v.is_nan()) {
        return Err(RfsError::InvalidInput(format!("{} contains NaN values", what)));
    }
    if values.iter().any(|v| v.is_infinite() || *v < 0.0) {
        return Err(RfsError::InvalidInput(format!(
            "{} contains negative or infinite values",
            what
        )));
    }
    Ok(())
}
