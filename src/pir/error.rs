//! Error handling for PIR module
//!
//! Every fallible operation in the crate returns [`PirError`]. Failures are
//! synchronous and leave server state untouched.

use thiserror::Error;

/// PIR operation error
#[derive(Debug, Error)]
pub enum PirError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("index {index} out of range for {element_count} elements")]
    IndexOutOfRange { index: usize, element_count: usize },

    #[error("no Galois keys registered for client {0}")]
    MissingClientKey(u32),

    #[error("failed to decode reply: {0}")]
    DecryptionError(String),

    #[error("database has not been preprocessed since its last change")]
    StalePreprocessedState,

    #[error("malformed query: {0}")]
    MalformedQuery(String),

    #[error("invalid Galois keys: {0}")]
    InvalidKey(String),

    #[error("invalid database: {0}")]
    InvalidDatabase(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("internal lock poisoned")]
    LockPoisoned,
}

/// Result type for PIR operations
pub type Result<T> = std::result::Result<T, PirError>;

/// Create a `PirError::InvalidParameters` with format string support
macro_rules! invalid_params {
    ($($arg:tt)*) => {
        $crate::pir::error::PirError::InvalidParameters(format!($($arg)*))
    };
}

pub(crate) use invalid_params;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = PirError::IndexOutOfRange {
            index: 7,
            element_count: 5,
        };
        assert_eq!(err.to_string(), "index 7 out of range for 5 elements");
        assert_eq!(
            invalid_params!("d = {}", 0).to_string(),
            "invalid parameters: d = 0"
        );
    }

    #[test]
    fn test_bincode_error_converts() {
        let err: PirError = bincode::deserialize::<u64>(&[1, 2]).unwrap_err().into();
        assert!(matches!(err, PirError::Serialization(_)));
    }
}
