//! Error types for MargaPlan.
//!
//! Only library loading can fail with an error; planner-path conditions
//! (planning failure, invalid start or goal, stale plan) are reported
//! through status returns instead.

use thiserror::Error;

/// MargaPlan error type
#[derive(Error, Debug)]
pub enum MargaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for MargaError {
    fn from(e: serde_json::Error) -> Self {
        MargaError::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MargaError>;
