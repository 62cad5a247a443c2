//! Block decoding error types.

use thiserror::Error;

/// Errors raised while decoding a block or one of its transactions.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A protobuf message could not be parsed.
    #[error("failed to decode {what}: {source}")]
    Protobuf {
        /// Which message was being decoded.
        what: &'static str,
        /// Underlying protobuf error.
        #[source]
        source: prost::DecodeError,
    },

    /// A required field was absent or empty.
    #[error("missing {0}")]
    Missing(&'static str),

    /// The envelope carried a different header type than expected.
    #[error("unexpected header type {actual}, expected {expected}")]
    UnexpectedHeaderType {
        /// Expected header type.
        expected: i32,
        /// Header type found.
        actual: i32,
    },
}

/// A specialized Result type for block decoding.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Decodes `bytes` as `M`, tagging failures with `what`.
pub(crate) fn decode<M: prost::Message + Default>(what: &'static str, bytes: &[u8]) -> Result<M> {
    M::decode(bytes).map_err(|source| DecodeError::Protobuf { what, source })
}
