//! Private signing keys.

use crate::{IdentityError, Result};
use p256::pkcs8::DecodePrivateKey;
use p256::SecretKey;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

/// A P-256 private scalar, wiped from memory on drop.
#[derive(Clone)]
pub struct PrivateKey {
    scalar: Zeroizing<Vec<u8>>,
}

impl PrivateKey {
    /// Generates a fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_secret(&SecretKey::random(&mut OsRng))
    }

    /// Parses a PEM key, either PKCS#8 (`PRIVATE KEY`) or SEC1
    /// (`EC PRIVATE KEY`).
    ///
    /// # Errors
    ///
    /// Returns an error if the PEM block cannot be decoded as a P-256 key.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let secret = if pem.contains("BEGIN EC PRIVATE KEY") {
            SecretKey::from_sec1_pem(pem)
                .map_err(|e| IdentityError::InvalidPrivateKey(e.to_string()))?
        } else {
            SecretKey::from_pkcs8_pem(pem)
                .map_err(|e| IdentityError::InvalidPrivateKey(e.to_string()))?
        };
        Ok(Self::from_secret(&secret))
    }

    /// Parses a DER-encoded PKCS#8 key.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a P-256 PKCS#8 document.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let secret = SecretKey::from_pkcs8_der(der)
            .map_err(|e| IdentityError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self::from_secret(&secret))
    }

    /// Creates a key from a raw 32-byte big-endian scalar.
    ///
    /// # Errors
    ///
    /// Returns an error if the scalar is zero, out of range or not 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|e| IdentityError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self::from_secret(&secret))
    }

    fn from_secret(secret: &SecretKey) -> Self {
        Self {
            scalar: Zeroizing::new(secret.to_bytes().to_vec()),
        }
    }

    /// Returns the raw scalar bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.scalar
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::pkcs8::{EncodePrivateKey, LineEnding};
    use pretty_assertions::assert_eq;

    #[test]
    fn key_from_pkcs8_pem() {
        let secret = SecretKey::random(&mut OsRng);
        let pem = secret.to_pkcs8_pem(LineEnding::LF).unwrap();

        let key = PrivateKey::from_pem(&pem).unwrap();
        assert_eq!(key.as_bytes(), secret.to_bytes().as_slice());
    }

    #[test]
    fn key_from_sec1_pem() {
        let secret = SecretKey::random(&mut OsRng);
        let pem = secret.to_sec1_pem(LineEnding::LF).unwrap();

        let key = PrivateKey::from_pem(&pem).unwrap();
        assert_eq!(key.as_bytes(), secret.to_bytes().as_slice());
    }

    #[test]
    fn key_from_pkcs8_der() {
        let secret = SecretKey::random(&mut OsRng);
        let der = secret.to_pkcs8_der().unwrap();

        let key = PrivateKey::from_pkcs8_der(der.as_bytes()).unwrap();
        assert_eq!(key.as_bytes(), secret.to_bytes().as_slice());
    }

    #[test]
    fn key_rejects_garbage() {
        assert!(PrivateKey::from_pem("not a key").is_err());
        assert!(PrivateKey::from_bytes(&[0u8; 32]).is_err());
        assert!(PrivateKey::from_bytes(&[1u8; 5]).is_err());
    }

    #[test]
    fn key_debug_hides_scalar() {
        let key = PrivateKey::generate();
        let rendered = format!("{key:?}");
        assert!(!rendered.contains(&hex::encode(key.as_bytes())));
    }
}
