use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for invalid operations on fields.
#[derive(Error, Debug)]
pub enum StratoError {
    #[error("axis '{axis}' not found in {source_name}")]
    MissingAxis { axis: String, source_name: String },
    #[error("variable '{variable}' not found in {source_name}")]
    MissingVariable {
        variable: String,
        source_name: String,
    },
    #[error("selection along '{axis}' is empty: {detail}")]
    EmptySelection { axis: String, detail: String },
    #[error("insufficient data: {detail} (needed at least {needed}, found {found})")]
    InsufficientData {
        needed: usize,
        found: usize,
        detail: String,
    },
    #[error("loader error: {0}")]
    Loader(String),
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("coordinate '{0}' is not strictly monotonic")]
    NonMonotonic(String),
    #[error("axis '{0}' must be reduced before comparing fields")]
    UnreducedAxis(String),
    #[error("Wrong pressure units. Expected {expected}, got {found}")]
    UnitMismatch { expected: String, found: String },
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Coarse classification of a [`StratoError`], used in batch reports.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// An axis or variable could not be found under the expected name
    Lookup,
    /// A range or level selection produced no data
    EmptySelection,
    /// The dataset could not be fetched
    Loader,
    /// Too few points for a regression or mean
    InsufficientData,
    /// The inputs were inconsistent with each other
    Invalid,
}

impl StratoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingAxis { .. } | Self::MissingVariable { .. } => ErrorKind::Lookup,
            Self::EmptySelection { .. } => ErrorKind::EmptySelection,
            Self::Loader(_) => ErrorKind::Loader,
            Self::InsufficientData { .. } => ErrorKind::InsufficientData,
            Self::ShapeMismatch(_)
            | Self::NonMonotonic(_)
            | Self::UnreducedAxis(_)
            | Self::UnitMismatch { .. }
            | Self::Config(_) => ErrorKind::Invalid,
        }
    }
}

impl From<toml::de::Error> for StratoError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

/// Convenience type for `Result<T, StratoError>`.
pub type StratoResult<T> = Result<T, StratoError>;
