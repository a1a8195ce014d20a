use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("empty input: {side} text is empty after normalization")]
    EmptyInput { side: &'static str },

    #[error("degenerate input: {reason}")]
    DegenerateInput { reason: String },

    #[error("dataset not found at path: {path}")]
    DatasetNotFound { path: PathBuf },

    #[error("length mismatch: expected {expected} values, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("invalid weights: alpha={alpha}, beta={beta} must lie in [0, 1] and sum to 1")]
    InvalidWeights { alpha: f64, beta: f64 },

    #[error("invalid dataset: {reason}")]
    InvalidDataset { reason: String },

    #[error("invalid catalog: {reason}")]
    InvalidCatalog { reason: String },

    #[error("invalid fold configuration: {reason}")]
    InvalidFolds { reason: String },

    #[error("invalid grid: {reason}")]
    InvalidGrid { reason: String },

    #[error("two different adapters share the name {name:?}")]
    DuplicateAdapter { name: String },

    #[error("failed to load semantic model: {reason}")]
    ModelLoad { reason: String },

    #[error("embedding inference failed: {reason}")]
    Inference { reason: String },

    #[error("failed to compile token pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl EvalError {
    pub fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateInput {
            reason: reason.into(),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::DegenerateInput { .. })
    }
}

#[cfg(feature = "bert")]
impl From<candle_core::Error> for EvalError {
    fn from(err: candle_core::Error) -> Self {
        Self::Inference {
            reason: err.to_string(),
        }
    }
}

pub fn ensure_same_len(expected: usize, actual: usize) -> Result<(), EvalError> {
    if expected == actual {
        Ok(())
    } else {
        Err(EvalError::LengthMismatch { expected, actual })
    }
}
