use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning a submission into a verdict.
#[derive(Error, Debug)]
pub enum FraudError {
    #[error("unknown {field} value '{value}'")]
    UnknownCategory { field: &'static str, value: String },

    #[error("{field} = {value}, expected {expected}")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("model unavailable at {}: {reason}", .path.display())]
    ModelUnavailable { path: PathBuf, reason: String },

    #[error("inference failed: {0}")]
    InferenceError(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, FraudError>;
