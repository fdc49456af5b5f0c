//! Error types for the observation pipeline.

use thiserror::Error;

use crate::storage::StoreError;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a capture line could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The leading tag is neither `A` nor `C`.
    #[error("unknown record kind `{0}`")]
    UnknownRecordKind(String),

    /// A required field is missing or does not parse.
    #[error("malformed {field} field: {reason}")]
    MalformedField { field: &'static str, reason: String },
}

impl ParseError {
    pub(crate) fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        ParseError::MalformedField {
            field,
            reason: reason.into(),
        }
    }
}

/// Pipeline error types.
#[derive(Debug, Error)]
pub enum Error {
    /// A capture line was malformed.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The power filter was given no readings.
    #[error("Cannot smooth an empty power sequence")]
    EmptyInput,

    /// A filter kernel that cannot be normalized or centered.
    #[error("Invalid filter kernel: {0}")]
    InvalidKernel(String),

    /// Weight and angle sequences differ in length.
    #[error("Weight and angle lists must be of equal length ({weights} weights, {angles} angles)")]
    LengthMismatch { weights: usize, angles: usize },

    /// The weight vector sums to zero.
    #[error("Weights sum to zero, center of gravity is undefined")]
    DivisionByZero,

    /// Store collaborator failure, passed through unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// IO error on the capture input.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
