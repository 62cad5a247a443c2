//! Enrolled signing identities.

use crate::PrivateKey;
use hfc_types::msp::SerializedIdentity;
use hfc_types::Message;

/// An enrolled member: certificate, MSP and private key.
///
/// Immutable after construction and shared read-only across tasks.
#[derive(Clone)]
pub struct Identity {
    certificate: Vec<u8>,
    msp_id: String,
    private_key: PrivateKey,
}

impl Identity {
    /// Creates an identity from a PEM certificate, MSP id and key.
    pub fn new(certificate: impl Into<Vec<u8>>, msp_id: impl Into<String>, private_key: PrivateKey) -> Self {
        Self {
            certificate: certificate.into(),
            msp_id: msp_id.into(),
            private_key,
        }
    }

    /// PEM-encoded certificate.
    #[must_use]
    pub fn certificate(&self) -> &[u8] {
        &self.certificate
    }

    /// MSP the certificate belongs to.
    #[must_use]
    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    /// Signing key.
    #[must_use]
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    /// Returns the serialized creator bytes placed in signature headers.
    #[must_use]
    pub fn creator(&self) -> Vec<u8> {
        SerializedIdentity {
            mspid: self.msp_id.clone(),
            id_bytes: self.certificate.clone(),
        }
        .encode_to_vec()
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("msp_id", &self.msp_id)
            .field("certificate_len", &self.certificate.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn creator_is_serialized_identity() {
        let cert = b"-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";
        let id = Identity::new(cert.to_vec(), "Org1MSP", PrivateKey::generate());

        let decoded = SerializedIdentity::decode(id.creator().as_slice()).unwrap();
        assert_eq!(decoded.mspid, "Org1MSP");
        assert_eq!(decoded.id_bytes, cert.to_vec());
    }
}
