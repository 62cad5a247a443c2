//! Full block decoding.

use crate::config::config_to_json;
use crate::envelope::{self, channel_header, endorsed_action, rw_sets, signature_header, Entry};
use crate::error::{decode, DecodeError, Result};
use crate::hash::header_hash;
use crate::metadata;
use crate::model::{
    Block, ChaincodeEvent, ChaincodeResponse, ChaincodeSpec, ConfigTransaction, Endorsement,
    EndorserTransaction, Timestamp, Transaction, TransactionBody,
};
use hfc_types::common::{self, BlockMetadataIndex, ConfigEnvelope, HeaderType, Payload};
use hfc_types::peer::{
    ChaincodeHeaderExtension, ChaincodeInvocationSpec, ChaincodeProposalPayload, TxValidationCode,
};
use hfc_types::Message;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Decodes a serialized block.
///
/// # Errors
///
/// Fails only if the bytes are not a block or the block has no header.
pub fn decode_block_bytes(bytes: &[u8]) -> Result<Block> {
    let raw: common::Block = decode("block", bytes)?;
    decode_block(&raw)
}

/// Decodes a block into structured records.
///
/// Metadata slots are decoded leniently. Each transaction entry is decoded
/// on its own: entries that fail to decode are logged and left out, and
/// entries whose header type is neither endorser nor config are skipped.
/// `tx_num` and `transaction_filter` always describe every raw entry.
///
/// # Errors
///
/// Fails only if the block has no header.
pub fn decode_block(raw: &common::Block) -> Result<Block> {
    let header = raw
        .header
        .as_ref()
        .ok_or(DecodeError::Missing("block header"))?;
    let data: &[Vec<u8>] = raw.data.as_ref().map_or(&[], |d| d.data.as_slice());
    let transaction_filter = metadata::validation_codes(raw, data.len());

    let mut block = Block {
        number: header.number,
        previous_hash: header.previous_hash.clone(),
        data_hash: header.data_hash.clone(),
        block_hash: header_hash(header),
        channel_id: String::new(),
        tx_num: data.len(),
        transactions: Vec::with_capacity(data.len()),
        creator_signature: metadata::slot_signature(raw, BlockMetadataIndex::Signatures),
        last_config: metadata::last_config(raw),
        transaction_filter,
        orderer_metadata: metadata::orderer(raw),
        first_tx_time: None,
        size: raw.encoded_len(),
        config: None,
    };

    for (index, bytes) in data.iter().enumerate() {
        let entry = match envelope::entry(bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(block = block.number, index, error = %e, "skipping undecodable entry");
                continue;
            }
        };
        if index == 0 {
            block.first_tx_time = entry.channel_header.timestamp.as_ref().map(Timestamp::from);
        }
        match decode_transaction(index, bytes.len(), &entry, &block.transaction_filter) {
            Ok(Some(tx)) => {
                block.channel_id = tx.channel_header.channel_id.clone();
                if let Some(config) = tx.as_config() {
                    debug!(block = block.number, "config block");
                    block.config = Some(config.config.clone());
                }
                block.transactions.push(tx);
            }
            Ok(None) => {
                debug!(
                    block = block.number,
                    index,
                    header_type = entry.channel_header.r#type,
                    "skipping entry with unhandled header type"
                );
            }
            Err(e) => {
                warn!(block = block.number, index, error = %e, "skipping undecodable transaction");
            }
        }
    }

    Ok(block)
}

fn decode_transaction(
    index: usize,
    size: usize,
    entry: &Entry,
    filter: &[u8],
) -> Result<Option<Transaction>> {
    let extension: ChaincodeHeaderExtension =
        decode("chaincode header extension", &entry.channel_header.extension)?;
    let sig_header: common::SignatureHeader =
        decode("signature header", &entry.header.signature_header)?;
    let signature_header = signature_header(&sig_header);

    let body = match HeaderType::try_from(entry.channel_header.r#type) {
        Ok(HeaderType::EndorserTransaction) => {
            TransactionBody::Endorser(Box::new(endorser_transaction(&entry.payload)?))
        }
        Ok(HeaderType::Config) => TransactionBody::Config(Box::new(config_transaction(
            &entry.payload,
            signature_header.clone(),
        )?)),
        _ => return Ok(None),
    };

    let validation_code = filter.get(index).copied().unwrap_or(metadata::NOT_VALIDATED);
    Ok(Some(Transaction {
        index,
        signature: entry.envelope.signature.clone(),
        channel_header: channel_header(&entry.channel_header, Some(&extension)),
        signature_header,
        validation_code,
        validation_code_name: TxValidationCode::name_of(validation_code).to_string(),
        size,
        body,
    }))
}

fn endorser_transaction(payload: &Payload) -> Result<EndorserTransaction> {
    let action = endorsed_action(&payload.data)?;

    let action_header: common::SignatureHeader =
        decode("action signature header", &action.action.header)?;
    let proposal_payload: ChaincodeProposalPayload = decode(
        "chaincode proposal payload",
        &action.action_payload.chaincode_proposal_payload,
    )?;
    let invocation: ChaincodeInvocationSpec =
        decode("chaincode invocation spec", &proposal_payload.input)?;
    let spec = invocation
        .chaincode_spec
        .ok_or(DecodeError::Missing("chaincode spec"))?;

    let endorsements = action
        .action_payload
        .action
        .as_ref()
        .map(|a| a.endorsements.as_slice())
        .unwrap_or_default()
        .iter()
        .map(|e| {
            let (msp_id, certificate) = envelope::creator(&e.endorser);
            Endorsement {
                signature_header: crate::model::SignatureHeader {
                    msp_id,
                    certificate,
                    nonce: Vec::new(),
                },
                signature: e.signature.clone(),
            }
        })
        .collect();

    let cc_action = &action.chaincode_action;
    let events = if cc_action.events.is_empty() {
        None
    } else {
        let event: hfc_types::peer::ChaincodeEvent = decode("chaincode event", &cc_action.events)?;
        Some(ChaincodeEvent {
            chaincode_id: event.chaincode_id,
            tx_id: event.tx_id,
            event_name: event.event_name,
            payload: event.payload,
        })
    };

    Ok(EndorserTransaction {
        action_signature_header: signature_header(&action_header),
        chaincode_spec: ChaincodeSpec {
            chaincode_type: spec.r#type,
            chaincode_id: spec.chaincode_id.as_ref().map(Into::into),
            args: spec
                .input
                .map(|input| {
                    input
                        .args
                        .iter()
                        .map(|a| String::from_utf8_lossy(a).into_owned())
                        .collect()
                })
                .unwrap_or_default(),
            timeout: spec.timeout,
        },
        endorsements,
        proposal_hash: action.response_payload.proposal_hash.clone(),
        response: cc_action.response.as_ref().map(|r| ChaincodeResponse {
            status: r.status,
            message: r.message.clone(),
            payload: r.payload.clone(),
        }),
        events,
        ns_rw_sets: rw_sets(&cc_action.results)?,
    })
}

fn config_transaction(
    payload: &Payload,
    signature_header: crate::model::SignatureHeader,
) -> Result<ConfigTransaction> {
    let config_envelope: ConfigEnvelope = decode("config envelope", &payload.data)?;
    let config = config_envelope
        .config
        .as_ref()
        .ok_or(DecodeError::Missing("config"))?;
    let last_update = config_envelope
        .last_update
        .as_ref()
        .ok_or(DecodeError::Missing("config last update"))?;

    let update_payload: Payload = decode("config update payload", &last_update.payload)?;
    let update_header = update_payload
        .header
        .ok_or(DecodeError::Missing("config update header"))?;
    let update_channel_header: common::ChannelHeader =
        decode("config update channel header", &update_header.channel_header)?;

    Ok(ConfigTransaction {
        action_signature_header: signature_header,
        proposal_hash: Sha256::digest(&last_update.payload).to_vec(),
        last_update_channel_header: channel_header(&update_channel_header, None),
        config: config_to_json(config),
    })
}
