//! Error types for hyperlog-storage
//!
//! Every public operation of the log store either succeeds or returns one of
//! these kinds. None of them is retried inside the store.

use hyperlog_core::IdentityError;
use thiserror::Error;

/// Errors that can occur in log store operations
#[derive(Debug, Error)]
pub enum LogError {
    /// The namespace belongs to another key, or the secret key does not
    /// belong to the public key
    #[error("Identity mismatch: {0}")]
    IdentityMismatch(String),

    /// Key bytes could not be parsed
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Persisted state is internally inconsistent
    #[error("Corrupt storage: {0}")]
    CorruptStorage(String),

    /// Read past the end of the log
    #[error("Index {index} out of range for log of length {length}")]
    OutOfRange { index: u64, length: u64 },

    /// Writes could not be made durable
    #[error("Durability failure: {0}")]
    DurabilityFailure(String),

    /// Another session already holds the namespace
    #[error("Concurrent writer conflict: {0}")]
    ConcurrentWriterConflict(String),

    /// Append attempted without the secret key
    #[error("Log is read-only")]
    ReadOnly,

    /// Operation attempted after close
    #[error("Session is closed")]
    SessionClosed,

    /// I/O error outside of the durability path
    #[error("I/O error: {0}")]
    Io(String),
}

/// Result type for log store operations
pub type LogResult<T> = Result<T, LogError>;

impl From<std::io::Error> for LogError {
    fn from(err: std::io::Error) -> Self {
        LogError::Io(err.to_string())
    }
}

impl From<IdentityError> for LogError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::KeyMismatch { .. } => LogError::IdentityMismatch(err.to_string()),
            IdentityError::InvalidKeyLength { .. } | IdentityError::InvalidKey(_) => {
                LogError::InvalidKey(err.to_string())
            }
            IdentityError::MissingSecretKey => LogError::ReadOnly,
            IdentityError::SignatureVerificationFailed => {
                LogError::CorruptStorage(err.to_string())
            }
        }
    }
}

impl LogError {
    /// Create a new CorruptStorage error
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptStorage(message.into())
    }

    /// Create a new DurabilityFailure error
    pub fn durability(message: impl Into<String>) -> Self {
        Self::DurabilityFailure(message.into())
    }

    /// Create a new IdentityMismatch error
    pub fn identity_mismatch(message: impl Into<String>) -> Self {
        Self::IdentityMismatch(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_error() {
        let err = LogError::OutOfRange {
            index: 5,
            length: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains('5'));
        assert!(msg.contains('3'));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LogError = io_err.into();
        assert!(matches!(err, LogError::Io(_)));
    }

    #[test]
    fn test_identity_error_conversion() {
        let err: LogError = IdentityError::KeyMismatch {
            public: "00".into(),
        }
        .into();
        assert!(matches!(err, LogError::IdentityMismatch(_)));

        let err: LogError = IdentityError::MissingSecretKey.into();
        assert!(matches!(err, LogError::ReadOnly));

        let err: LogError = IdentityError::InvalidKeyLength {
            expected: 32,
            actual: 1,
        }
        .into();
        assert!(matches!(err, LogError::InvalidKey(_)));

        let err: LogError = IdentityError::SignatureVerificationFailed.into();
        assert!(matches!(err, LogError::CorruptStorage(_)));
    }
}
