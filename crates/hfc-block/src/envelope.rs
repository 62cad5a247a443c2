//! Per-entry decoding steps shared by the full and filtered decoders.

use crate::error::{decode, DecodeError, Result};
use crate::model::{self, ChaincodeRef, KvRead, KvWrite, NsReadWriteSet};
use hfc_types::common::{self, Envelope, Payload};
use hfc_types::msp::SerializedIdentity;
use hfc_types::peer::{
    ChaincodeAction, ChaincodeActionPayload, ChaincodeHeaderExtension, ProposalResponsePayload,
    Transaction, TransactionAction,
};
use hfc_types::rwset::{KvRwSet, TxReadWriteSet};
use tracing::warn;

/// An entry decoded down to its channel header.
pub(crate) struct Entry {
    pub envelope: Envelope,
    pub payload: Payload,
    pub header: common::Header,
    pub channel_header: common::ChannelHeader,
}

pub(crate) fn entry(data: &[u8]) -> Result<Entry> {
    let envelope: Envelope = decode("envelope", data)?;
    let payload: Payload = decode("payload", &envelope.payload)?;
    let header = payload
        .header
        .clone()
        .ok_or(DecodeError::Missing("payload header"))?;
    let channel_header = decode("channel header", &header.channel_header)?;
    Ok(Entry {
        envelope,
        payload,
        header,
        channel_header,
    })
}

/// Converts a protobuf signature header, tolerating an undecodable creator.
pub(crate) fn signature_header(header: &common::SignatureHeader) -> model::SignatureHeader {
    let (msp_id, certificate) = creator(&header.creator);
    model::SignatureHeader {
        msp_id,
        certificate,
        nonce: header.nonce.clone(),
    }
}

/// Splits serialized creator bytes into MSP id and PEM text.
pub(crate) fn creator(bytes: &[u8]) -> (String, String) {
    match decode::<SerializedIdentity>("serialized identity", bytes) {
        Ok(id) => (id.mspid, String::from_utf8_lossy(&id.id_bytes).into_owned()),
        Err(_) => (String::new(), String::new()),
    }
}

pub(crate) fn channel_header(
    header: &common::ChannelHeader,
    extension: Option<&ChaincodeHeaderExtension>,
) -> model::ChannelHeader {
    model::ChannelHeader {
        header_type: header.r#type,
        version: header.version,
        timestamp: header.timestamp.as_ref().map(model::Timestamp::from),
        channel_id: header.channel_id.clone(),
        tx_id: header.tx_id.clone(),
        epoch: header.epoch,
        chaincode_id: extension
            .and_then(|ext| ext.chaincode_id.as_ref())
            .map(ChaincodeRef::from),
    }
}

/// First action of an endorser transaction with its payloads unpacked.
pub(crate) struct EndorsedAction {
    pub action: TransactionAction,
    pub action_payload: ChaincodeActionPayload,
    pub response_payload: ProposalResponsePayload,
    pub chaincode_action: ChaincodeAction,
}

pub(crate) fn endorsed_action(data: &[u8]) -> Result<EndorsedAction> {
    let tx: Transaction = decode("transaction", data)?;
    let action = tx
        .actions
        .into_iter()
        .next()
        .ok_or(DecodeError::Missing("transaction action"))?;
    let action_payload: ChaincodeActionPayload =
        decode("chaincode action payload", &action.payload)?;
    let endorsed = action_payload
        .action
        .as_ref()
        .filter(|a| !a.proposal_response_payload.is_empty())
        .ok_or(DecodeError::Missing("endorsed action"))?;
    let response_payload: ProposalResponsePayload =
        decode("proposal response payload", &endorsed.proposal_response_payload)?;
    if response_payload.extension.is_empty() {
        return Err(DecodeError::Missing("proposal response extension"));
    }
    let chaincode_action = decode("chaincode action", &response_payload.extension)?;
    Ok(EndorsedAction {
        action,
        action_payload,
        response_payload,
        chaincode_action,
    })
}

/// Decodes the namespaced read-write sets in chaincode results.
///
/// A namespace whose set cannot be decoded is logged and left out; the
/// transaction itself is only rejected if the outer set is malformed.
pub(crate) fn rw_sets(results: &[u8]) -> Result<Vec<NsReadWriteSet>> {
    let tx_rw_set: TxReadWriteSet = decode("tx read write set", results)?;
    let mut sets = Vec::with_capacity(tx_rw_set.ns_rwset.len());
    for ns in tx_rw_set.ns_rwset {
        let kv: KvRwSet = match decode("kv read write set", &ns.rwset) {
            Ok(kv) => kv,
            Err(e) => {
                warn!(namespace = %ns.namespace, error = %e, "skipping namespace read-write set");
                continue;
            }
        };
        sets.push(NsReadWriteSet {
            namespace: ns.namespace,
            reads: kv
                .reads
                .into_iter()
                .map(|r| KvRead {
                    key: r.key,
                    version: r.version.map(|v| (v.block_num, v.tx_num)),
                })
                .collect(),
            writes: kv
                .writes
                .into_iter()
                .map(|w| KvWrite {
                    key: w.key,
                    is_delete: w.is_delete,
                    value: w.value,
                })
                .collect(),
            metadata_writes: kv.metadata_writes.into_iter().map(|m| m.key).collect(),
            range_queries: kv.range_queries_info.len(),
        });
    }
    Ok(sets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hfc_types::rwset::{KvWrite as ProtoKvWrite, NsReadWriteSet as ProtoNs};
    use hfc_types::Message;

    #[test]
    fn test_bad_namespace_is_skipped() {
        let good = KvRwSet {
            writes: vec![ProtoKvWrite {
                key: "a".into(),
                is_delete: false,
                value: b"1".to_vec(),
            }],
            ..Default::default()
        }
        .encode_to_vec();
        let results = TxReadWriteSet {
            data_model: 0,
            ns_rwset: vec![
                ProtoNs {
                    namespace: "broken".into(),
                    rwset: vec![0xff, 0xff],
                    collection_hashed_rwset: vec![],
                },
                ProtoNs {
                    namespace: "mycc".into(),
                    rwset: good,
                    collection_hashed_rwset: vec![],
                },
            ],
        }
        .encode_to_vec();

        let sets = rw_sets(&results).unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].namespace, "mycc");
        assert_eq!(sets[0].writes[0].key, "a");
    }

    #[test]
    fn test_empty_results() {
        assert!(rw_sets(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_creator_fallback() {
        assert_eq!(creator(&[0xff]), (String::new(), String::new()));
    }
}
