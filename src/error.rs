//! Error types for the analytics engine.

use thiserror::Error;

/// Result alias for engine operations that can reject their inputs.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Most engine functions map malformed numbers to neutral values instead of
/// failing. The variants here cover the cases where a neutral value would be
/// misleading.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid inputs: {reason}")]
    InvalidInputs { reason: String },
}

impl EngineError {
    pub fn invalid_inputs(reason: impl Into<String>) -> Self {
        Self::InvalidInputs {
            reason: reason.into(),
        }
    }
}
