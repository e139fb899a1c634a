/// Error types for the river flow synthesizer
use thiserror::Error;

/// Main error type for training and simulation
#[derive(Error, Debug)]
pub enum RfsError {
    /// Historical datasets are empty, misaligned or otherwise unusable
    #[error("Training data error: {0}")]
    TrainingData(String),

    /// A regression produced non-finite coefficients or no usable spread
    #[error("Degenerate fit: {0}")]
    DegenerateFit(String),

    /// A forcing sequence does not match the expected length
    #[error("Input shape mismatch: {what} has {found} samples, expected {expected}")]
    InputShape {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// Forcing values outside their physical domain (negative or non-finite)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration values that cannot describe a simulation run
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Failed to parse CSV data
    #[error("Failed to parse CSV: {0}")]
    CsvParse(#[from] csv::Error),

    /// Failed to parse JSON data
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Failed to read input from disk
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Results using RfsError
pub type Result<T> = std::result::Result<T, RfsError>;
