//! Channel creation and update transactions.

use crate::error::{decode, Result};
use crate::signer::{now, Signer};
use hfc_block::DecodeError;
use hfc_types::common::{
    ChannelHeader, ConfigSignature, ConfigUpdateEnvelope, Envelope, Header, HeaderType, Payload,
};
use hfc_types::Message;
use tracing::debug;

/// Re-signs a channel creation or update transaction for submission.
///
/// `envelope_bytes` is a serialized envelope whose payload carries a
/// `CONFIG_UPDATE`, as produced by channel configuration tooling. The
/// submitter's signature over the config update is appended to the existing
/// signatures, and the result is wrapped in a fresh envelope addressed to
/// `channel_id`.
///
/// # Errors
///
/// A decode error if the bytes are not an envelope with a `CONFIG_UPDATE`
/// payload.
pub fn config_update_envelope(
    envelope_bytes: &[u8],
    channel_id: &str,
    signer: &Signer,
) -> Result<Envelope> {
    let envelope: Envelope = decode("envelope", envelope_bytes)?;
    let payload: Payload = decode("payload", &envelope.payload)?;
    let header = payload.header.ok_or(DecodeError::Missing("payload header"))?;
    let channel_header: ChannelHeader = decode("channel header", &header.channel_header)?;
    if channel_header.r#type != HeaderType::ConfigUpdate as i32 {
        return Err(DecodeError::UnexpectedHeaderType {
            expected: HeaderType::ConfigUpdate as i32,
            actual: channel_header.r#type,
        }
        .into());
    }

    let mut update: ConfigUpdateEnvelope = decode("config update envelope", &payload.data)?;
    let tx_id = signer.new_transaction_id();
    let signature_header = signer.signature_header(&tx_id).encode_to_vec();
    let mut signed = signature_header.clone();
    signed.extend_from_slice(&update.config_update);
    update.signatures.push(ConfigSignature {
        signature: signer.sign(&signed)?,
        signature_header,
    });

    let channel_header = ChannelHeader {
        r#type: HeaderType::ConfigUpdate as i32,
        version: 0,
        timestamp: Some(now()),
        channel_id: channel_id.to_string(),
        tx_id: String::new(),
        epoch: 0,
        extension: Vec::new(),
        tls_cert_hash: Vec::new(),
    };
    let payload = Payload {
        header: Some(Header {
            channel_header: channel_header.encode_to_vec(),
            signature_header: signer.signature_header(&tx_id).encode_to_vec(),
        }),
        data: update.encode_to_vec(),
    };
    debug!(channel = %channel_id, signatures = update.signatures.len(), "signed config update");
    signer.sign_payload(&payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use hfc_identity::{EcdsaP256Sha256, Identity, PrivateKey};
    use hfc_types::common::SignatureHeader;
    use std::sync::Arc;

    fn signer() -> Signer {
        Signer::new(
            Identity::new(b"admin-cert".to_vec(), "Org1MSP", PrivateKey::generate()),
            Arc::new(EcdsaP256Sha256),
        )
    }

    fn channel_tx(header_type: HeaderType) -> Vec<u8> {
        let update = ConfigUpdateEnvelope {
            config_update: b"update".to_vec(),
            signatures: vec![ConfigSignature {
                signature_header: b"other".to_vec(),
                signature: b"sig".to_vec(),
            }],
        };
        let channel_header = ChannelHeader {
            r#type: header_type as i32,
            channel_id: "newchannel".into(),
            ..Default::default()
        };
        let payload = Payload {
            header: Some(Header {
                channel_header: channel_header.encode_to_vec(),
                signature_header: Vec::new(),
            }),
            data: update.encode_to_vec(),
        };
        Envelope {
            payload: payload.encode_to_vec(),
            signature: Vec::new(),
        }
        .encode_to_vec()
    }

    #[test]
    fn test_appends_signature() {
        let signer = signer();
        let envelope =
            config_update_envelope(&channel_tx(HeaderType::ConfigUpdate), "newchannel", &signer)
                .unwrap();
        assert!(!envelope.signature.is_empty());

        let payload = Payload::decode(envelope.payload.as_slice()).unwrap();
        let header = payload.header.unwrap();
        let channel_header = ChannelHeader::decode(header.channel_header.as_slice()).unwrap();
        assert_eq!(channel_header.r#type, HeaderType::ConfigUpdate as i32);
        assert_eq!(channel_header.channel_id, "newchannel");
        assert!(channel_header.tx_id.is_empty());

        let update = ConfigUpdateEnvelope::decode(payload.data.as_slice()).unwrap();
        assert_eq!(update.config_update, b"update".to_vec());
        assert_eq!(update.signatures.len(), 2);
        let added = SignatureHeader::decode(update.signatures[1].signature_header.as_slice()).unwrap();
        assert_eq!(added.creator, signer.creator());
    }

    #[test]
    fn test_rejects_non_config_update() {
        let result = config_update_envelope(
            &channel_tx(HeaderType::EndorserTransaction),
            "newchannel",
            &signer(),
        );
        assert!(matches!(
            result,
            Err(ClientError::Decode(DecodeError::UnexpectedHeaderType { .. }))
        ));
    }
}
