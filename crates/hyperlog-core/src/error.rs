//! Error types for Hyperlog identities

use thiserror::Error;

/// Errors related to log identity keys
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Secret key does not belong to public key {public}")]
    KeyMismatch { public: String },

    #[error("Secret key required to sign")]
    MissingSecretKey,

    #[error("Signature verification failed")]
    SignatureVerificationFailed,
}

/// Result type for identity operations
pub type IdentityResult<T> = Result<T, IdentityError>;
