//! The submitting identity paired with its crypto suite.

use crate::error::Result;
use hfc_identity::{CryptoSuite, Identity, TransactionId};
use hfc_types::common::{Envelope, Payload, SignatureHeader};
use hfc_types::{Message, Timestamp};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Signs on behalf of one identity.
///
/// Cheap to clone and safe to share between concurrent operations; both
/// halves are read-only after construction.
#[derive(Clone)]
pub struct Signer {
    identity: Arc<Identity>,
    suite: Arc<dyn CryptoSuite>,
}

impl Signer {
    /// Pairs an identity with the suite that signs for it.
    pub fn new(identity: Identity, suite: Arc<dyn CryptoSuite>) -> Self {
        Self {
            identity: Arc::new(identity),
            suite,
        }
    }

    /// The signing identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The crypto suite.
    pub fn suite(&self) -> &dyn CryptoSuite {
        self.suite.as_ref()
    }

    /// MSP of the signing identity.
    pub fn msp_id(&self) -> &str {
        self.identity.msp_id()
    }

    /// Serialized creator placed in signature headers.
    pub fn creator(&self) -> Vec<u8> {
        self.identity.creator()
    }

    /// Signs `message` with the identity's key.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        Ok(self.suite.sign(message, self.identity.private_key())?)
    }

    /// Draws a fresh nonce and derives its transaction id.
    pub fn new_transaction_id(&self) -> TransactionId {
        TransactionId::new(self.creator(), self.suite.as_ref())
    }

    /// Signature header for `tx_id`.
    pub fn signature_header(&self, tx_id: &TransactionId) -> SignatureHeader {
        SignatureHeader {
            creator: tx_id.creator().to_vec(),
            nonce: tx_id.nonce().to_vec(),
        }
    }

    /// Serializes and signs `payload`.
    pub fn sign_payload(&self, payload: &Payload) -> Result<Envelope> {
        let bytes = payload.encode_to_vec();
        let signature = self.sign(&bytes)?;
        Ok(Envelope {
            payload: bytes,
            signature,
        })
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Wall-clock time as a protobuf timestamp.
pub(crate) fn now() -> Timestamp {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    Timestamp {
        seconds: elapsed.as_secs() as i64,
        nanos: elapsed.subsec_nanos() as i32,
    }
}
