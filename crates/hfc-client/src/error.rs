//! Client error types.

use hfc_block::DecodeError;
use hfc_identity::IdentityError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to peers and orderers.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Dial, stream or RPC failure. Never retried by the client.
    #[error("transport error: {0}")]
    Transport(String),

    /// A peer answered with a non-success endorsement.
    #[error("proposal rejected by {peer}: status {status}: {message}")]
    ProposalRejected {
        /// Peer that answered.
        peer: String,
        /// Status code carried by the response.
        status: i32,
        /// Message carried by the response.
        message: String,
    },

    /// A peer required for the submission failed to endorse.
    #[error("endorsement from {peer} failed: {source}")]
    EndorsementFailed {
        /// Peer that failed.
        peer: String,
        /// What went wrong.
        source: Box<ClientError>,
    },

    /// Two peers endorsed different simulation results.
    #[error("endorsement payload from {other} differs from {first}")]
    EndorsementMismatch {
        /// Peer whose payload is used as reference.
        first: String,
        /// Peer whose payload differs.
        other: String,
    },

    /// The ordering service refused the transaction.
    #[error("broadcast rejected: status {status}: {info}")]
    BroadcastRejected {
        /// Acknowledgment status.
        status: i32,
        /// Acknowledgment info text.
        info: String,
    },

    /// Deliver did not produce a response in time.
    #[error("orderer did not respond within {0:?}")]
    OrdererTimeout(Duration),

    /// Deliver ended with a status instead of a block.
    #[error("deliver ended with status {status}")]
    DeliverRejected {
        /// Terminal status.
        status: i32,
    },

    /// A message could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The request cannot be built.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// An endorsement policy expression did not parse.
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    /// No endorsing peer is available.
    #[error("no peers configured")]
    NoPeersConfigured,

    /// No ordering endpoint is available.
    #[error("no orderers configured")]
    NoOrderersConfigured,

    /// A peer name does not match the configuration.
    #[error("unknown peer: {0}")]
    UnknownPeer(String),

    /// An orderer name does not match the configuration.
    #[error("unknown orderer: {0}")]
    UnknownOrderer(String),

    /// Signing failed or the crypto suite is unsupported.
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    /// The configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

/// A specialized Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

impl From<tonic::Status> for ClientError {
    fn from(status: tonic::Status) -> Self {
        Self::Transport(format!("{:?}: {}", status.code(), status.message()))
    }
}

impl From<tonic::transport::Error> for ClientError {
    fn from(err: tonic::transport::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<prost::DecodeError> for ClientError {
    fn from(source: prost::DecodeError) -> Self {
        Self::Decode(DecodeError::Protobuf {
            what: "message",
            source,
        })
    }
}

impl ClientError {
    /// Peer blamed by this error, if any.
    pub fn peer(&self) -> Option<&str> {
        match self {
            Self::ProposalRejected { peer, .. } | Self::EndorsementFailed { peer, .. } => Some(peer),
            Self::EndorsementMismatch { other, .. } => Some(other),
            Self::UnknownPeer(peer) => Some(peer),
            _ => None,
        }
    }
}

/// Decodes `bytes` as `M`, tagging failures with `what`.
pub(crate) fn decode<M: prost::Message + Default>(what: &'static str, bytes: &[u8]) -> Result<M> {
    M::decode(bytes).map_err(|source| ClientError::Decode(DecodeError::Protobuf { what, source }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endorsement_failure_names_peer() {
        let err = ClientError::EndorsementFailed {
            peer: "peer1".into(),
            source: Box::new(ClientError::Transport("connection refused".into())),
        };
        assert_eq!(err.peer(), Some("peer1"));
        assert_eq!(
            err.to_string(),
            "endorsement from peer1 failed: transport error: connection refused"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_status_conversion() {
        let err: ClientError = tonic::Status::unavailable("down").into();
        assert!(matches!(err, ClientError::Transport(ref m) if m.contains("down")));
    }
}
