//! Error types for identity operations.

use thiserror::Error;

/// Errors that can occur during identity operations.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The private key could not be parsed.
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// The signature verification failed.
    #[error("signature verification failed")]
    InvalidSignature,

    /// The requested suite is not available.
    #[error("unsupported crypto suite: family={family} algorithm={algorithm} hash={hash}")]
    UnsupportedSuite {
        /// Algorithm family, e.g. `ecdsa`.
        family: String,
        /// Signature algorithm, e.g. `P256-SHA256`.
        algorithm: String,
        /// Hash function, e.g. `SHA2-256`.
        hash: String,
    },
}

/// A specialized Result type for identity operations.
pub type Result<T> = std::result::Result<T, IdentityError>;
