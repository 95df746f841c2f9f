//! Error types for echobench core operations.

use thiserror::Error;

/// Core error type for echobench operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Response text does not follow the echo format.
    #[error("malformed echo response: {reason}")]
    MalformedResponse {
        /// What was wrong with the response.
        reason: String,
    },

    /// A numeric field in the response could not be parsed.
    #[error("invalid {field} in echo response: {value:?}")]
    InvalidField {
        /// Name of the field.
        field: &'static str,
        /// Raw text of the field.
        value: String,
    },
}

impl Error {
    /// Creates a malformed response error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }
}

/// Result type alias for echobench core operations.
pub type Result<T> = std::result::Result<T, Error>;
