//! Error types for the audit chain.

use thiserror::Error;

/// Result type alias for audit chain operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in audit chain operations.
///
/// Structural chain defects are never reported through this type; they are
/// collected in [`ChainVerification::errors`](crate::ledger::ChainVerification).
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Mining errors
    #[error("Proof-of-work not found after {attempts} attempts at difficulty {difficulty}")]
    MiningExhausted { attempts: u64, difficulty: usize },

    #[error("Mining aborted: chain disposed")]
    MiningAborted,

    #[error("Block rejected: {0}")]
    BlockRejected(String),

    // Snapshot errors
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Imported chain rejected with {} error(s)", .errors.len())]
    ImportRejected { errors: Vec<String> },

    // Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            Error::DeserializationError(err.to_string())
        } else {
            Error::SerializationError(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_rejected_display() {
        let err = Error::ImportRejected {
            errors: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "Imported chain rejected with 2 error(s)");
    }

    #[test]
    fn test_json_syntax_error_maps_to_deserialization() {
        let err: Error = serde_json::from_str::<u32>("{not json").unwrap_err().into();
        assert!(matches!(err, Error::DeserializationError(_)));
    }
}
