//! Crypto suites used to hash and sign protocol messages.

use crate::{IdentityError, PrivateKey, Result};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};

/// Hashing and signing primitives used by every client component.
///
/// Implementations must be usable from many tasks at once.
pub trait CryptoSuite: Send + Sync {
    /// Signs `message` with `key`, returning an encoded signature.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not usable by this suite.
    fn sign(&self, message: &[u8], key: &PrivateKey) -> Result<Vec<u8>>;

    /// Hashes `message`.
    fn hash(&self, message: &[u8]) -> Vec<u8>;
}

/// ECDSA over P-256 with SHA-256, emitting low-S DER signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcdsaP256Sha256;

impl EcdsaP256Sha256 {
    /// Verifies a DER signature against a SEC1-encoded public key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key or signature is malformed or does not match.
    pub fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> Result<()> {
        let key = VerifyingKey::from_sec1_bytes(public_key)
            .map_err(|_| IdentityError::InvalidSignature)?;
        let sig = Signature::from_der(signature).map_err(|_| IdentityError::InvalidSignature)?;
        key.verify(message, &sig)
            .map_err(|_| IdentityError::InvalidSignature)
    }

    /// Returns the SEC1 uncompressed public key matching `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not a valid P-256 scalar.
    pub fn public_key(&self, key: &PrivateKey) -> Result<Vec<u8>> {
        let signing = signing_key(key)?;
        Ok(signing
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec())
    }
}

impl CryptoSuite for EcdsaP256Sha256 {
    fn sign(&self, message: &[u8], key: &PrivateKey) -> Result<Vec<u8>> {
        let signing = signing_key(key)?;
        let signature: Signature = signing.sign(message);
        // Verifiers reject high-S signatures.
        let signature = signature.normalize_s().unwrap_or(signature);
        Ok(signature.to_der().as_bytes().to_vec())
    }

    fn hash(&self, message: &[u8]) -> Vec<u8> {
        Sha256::digest(message).to_vec()
    }
}

fn signing_key(key: &PrivateKey) -> Result<SigningKey> {
    SigningKey::from_slice(key.as_bytes())
        .map_err(|e| IdentityError::InvalidPrivateKey(e.to_string()))
}

/// Resolves a suite from its configured family, algorithm and hash names.
///
/// Only `ecdsa` / `P256-SHA256` / `SHA2-256` is available.
///
/// # Errors
///
/// Returns [`IdentityError::UnsupportedSuite`] for any other combination.
pub fn suite_for(family: &str, algorithm: &str, hash: &str) -> Result<Box<dyn CryptoSuite>> {
    match (
        family.to_ascii_lowercase().as_str(),
        algorithm.to_ascii_uppercase().as_str(),
        hash.to_ascii_uppercase().as_str(),
    ) {
        ("ecdsa", "P256-SHA256", "SHA2-256") => Ok(Box::new(EcdsaP256Sha256)),
        _ => Err(IdentityError::UnsupportedSuite {
            family: family.to_string(),
            algorithm: algorithm.to_string(),
            hash: hash.to_string(),
        }),
    }
}
