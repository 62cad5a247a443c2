//! Transaction identifiers.

use crate::CryptoSuite;
use rand::rngs::OsRng;
use rand::RngCore;

/// Length of the random nonce placed in every signature header.
pub const NONCE_SIZE: usize = 24;

/// A transaction id bound to the nonce and creator it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionId {
    id: String,
    nonce: Vec<u8>,
    creator: Vec<u8>,
}

impl TransactionId {
    /// Derives a new id for `creator` from a fresh random nonce.
    #[must_use]
    pub fn new(creator: Vec<u8>, suite: &dyn CryptoSuite) -> Self {
        let mut nonce = vec![0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);
        Self::with_nonce(nonce, creator, suite)
    }

    /// Derives the id as `hex(hash(nonce || creator))`.
    #[must_use]
    pub fn with_nonce(nonce: Vec<u8>, creator: Vec<u8>, suite: &dyn CryptoSuite) -> Self {
        let mut material = Vec::with_capacity(nonce.len() + creator.len());
        material.extend_from_slice(&nonce);
        material.extend_from_slice(&creator);
        let id = hex::encode(suite.hash(&material));
        Self { id, nonce, creator }
    }

    /// Lowercase hex id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Nonce placed in the signature header.
    #[must_use]
    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    /// Serialized creator identity.
    #[must_use]
    pub fn creator(&self) -> &[u8] {
        &self.creator
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}
