//! Block metadata slots.
//!
//! Each slot is decoded on its own. A missing or malformed slot produces an
//! empty or zero value instead of failing the block.

use crate::envelope::signature_header;
use crate::error::{decode, DecodeError, Result};
use crate::model::{LastConfigMetadata, OrdererMetadata, SignatureMetadata};
use hfc_types::common::{
    Block, BlockMetadataIndex, LastConfig, Metadata, OrdererBlockMetadata, SignatureHeader,
};
use hfc_types::orderer::KafkaMetadata;
use tracing::debug;

/// Validation code assumed for entries the filter slot does not cover.
pub const NOT_VALIDATED: u8 = 254;

fn raw_slot(block: &Block, index: BlockMetadataIndex) -> Option<&[u8]> {
    block
        .metadata
        .as_ref()
        .and_then(|m| m.metadata.get(index as usize))
        .map(Vec::as_slice)
}

fn slot(block: &Block, index: BlockMetadataIndex) -> Result<Metadata> {
    let bytes = raw_slot(block, index).ok_or(DecodeError::Missing("metadata slot"))?;
    decode("metadata", bytes)
}

/// First signature recorded in a metadata slot.
pub fn slot_signature(block: &Block, index: BlockMetadataIndex) -> Option<SignatureMetadata> {
    let metadata = slot(block, index).ok()?;
    let first = metadata.signatures.first()?;
    let header: SignatureHeader = match decode("metadata signature header", &first.signature_header) {
        Ok(header) => header,
        Err(e) => {
            debug!(slot = ?index, error = %e, "undecodable metadata signature header");
            return None;
        }
    };
    Some(SignatureMetadata {
        signature_header: signature_header(&header),
        signature: first.signature.clone(),
    })
}

/// Last-config index stored in the LAST_CONFIG slot, or zero.
///
/// The index is written and read back little-endian, so this is the plain
/// protobuf value.
pub fn last_config(block: &Block) -> LastConfigMetadata {
    let index = slot(block, BlockMetadataIndex::LastConfig)
        .and_then(|m| decode::<LastConfig>("last config", &m.value))
        .map(|lc| lc.index)
        .unwrap_or_else(|e| {
            debug!(error = %e, "last config slot unavailable");
            0
        });
    LastConfigMetadata {
        last_config_block_num: index,
        signature_data: slot_signature(block, BlockMetadataIndex::LastConfig),
    }
}

/// Orderer offset stored in the ORDERER slot, or zero.
///
/// The offset is written little-endian and read back big-endian, which
/// reverses its byte order. Existing consumers depend on this value, so it
/// is kept as is.
pub fn orderer(block: &Block) -> OrdererMetadata {
    let offset = slot(block, BlockMetadataIndex::Orderer)
        .and_then(|m| decode::<KafkaMetadata>("kafka metadata", &m.value))
        .map(|km| u64::from_be_bytes((km.last_offset_persisted as u64).to_le_bytes()))
        .unwrap_or_else(|e| {
            debug!(error = %e, "orderer slot unavailable");
            0
        });
    OrdererMetadata {
        last_offset_persisted: offset,
        signature_data: slot_signature(block, BlockMetadataIndex::Orderer),
    }
}

/// One validation code per raw entry.
///
/// Entries start as [`NOT_VALIDATED`] and are overwritten positionally by the
/// TRANSACTIONS_FILTER slot. Filter bytes beyond `tx_count` are ignored.
pub fn validation_codes(block: &Block, tx_count: usize) -> Vec<u8> {
    let mut codes = vec![NOT_VALIDATED; tx_count];
    if let Some(filter) = raw_slot(block, BlockMetadataIndex::TransactionsFilter) {
        for (code, b) in codes.iter_mut().zip(filter) {
            *code = *b;
        }
    }
    codes
}

/// Index of the last configuration block, as recorded by the orderer.
///
/// Prefers the orderer block metadata in the SIGNATURES slot and falls back
/// to the LAST_CONFIG slot when that is empty.
///
/// # Errors
///
/// Unlike the lenient accessors above, this fails if neither slot decodes.
pub fn last_config_index(block: &Block) -> Result<u64> {
    let signatures = slot(block, BlockMetadataIndex::Signatures)?;
    if !signatures.value.is_empty() {
        let obm: OrdererBlockMetadata = decode("orderer block metadata", &signatures.value)?;
        return obm
            .last_config
            .map(|lc| lc.index)
            .ok_or(DecodeError::Missing("last config in orderer block metadata"));
    }
    let metadata = slot(block, BlockMetadataIndex::LastConfig)?;
    let lc: LastConfig = decode("last config", &metadata.value)?;
    Ok(lc.index)
}
