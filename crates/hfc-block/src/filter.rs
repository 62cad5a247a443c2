//! Filtered block decoding.
//!
//! The filtered view keeps only read-write sets, validation codes and sizes
//! of endorser transactions. It is what ledger queries and low-bandwidth
//! subscriptions return.

use crate::envelope::{self, endorsed_action, rw_sets};
use crate::error::{DecodeError, Result};
use crate::hash::header_hash;
use crate::metadata;
use crate::model::{FilterBlock, FilterTransaction, FilterTx};
use hfc_types::common::{self, HeaderType};
use hfc_types::peer::TxValidationCode;
use tracing::{debug, warn};

/// Decodes the filtered view of a block.
///
/// # Errors
///
/// Fails only if the block has no header.
pub fn filter_block(raw: &common::Block) -> Result<FilterBlock> {
    let header = raw
        .header
        .as_ref()
        .ok_or(DecodeError::Missing("block header"))?;
    let data: &[Vec<u8>] = raw.data.as_ref().map_or(&[], |d| d.data.as_slice());
    let transaction_filter = metadata::validation_codes(raw, data.len());

    let mut transactions = Vec::with_capacity(data.len());
    for (index, bytes) in data.iter().enumerate() {
        let entry = match envelope::entry(bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(block = header.number, index, error = %e, "skipping undecodable entry");
                continue;
            }
        };
        match HeaderType::try_from(entry.channel_header.r#type) {
            Ok(HeaderType::EndorserTransaction) => {}
            Ok(HeaderType::Config) => {
                debug!(block = header.number, "config block");
                continue;
            }
            _ => continue,
        }
        let ns_rw_sets = match endorsed_action(&entry.payload.data)
            .and_then(|action| rw_sets(&action.chaincode_action.results))
        {
            Ok(sets) => sets,
            Err(e) => {
                warn!(block = header.number, index, error = %e, "skipping undecodable transaction");
                continue;
            }
        };
        let validation_code = transaction_filter[index];
        transactions.push(FilterTransaction {
            index,
            tx_id: entry.channel_header.tx_id,
            ns_rw_sets,
            validation_code,
            validation_code_name: TxValidationCode::name_of(validation_code).to_string(),
            size: bytes.len(),
        });
    }

    Ok(FilterBlock {
        tx_num: data.len(),
        block_num: header.number,
        block_hash: header_hash(header),
        pre_block_hash: header.previous_hash.clone(),
        last_config_block: metadata::last_config(raw).last_config_block_num,
        tx_hash: header.data_hash.clone(),
        transaction_filter,
        transactions,
    })
}

/// Finds the channel-header time of `tx_id` within `raw`.
///
/// Returns the block number with a zero timestamp if no entry matches.
pub fn find_transaction_time(raw: &common::Block, tx_id: &str) -> FilterTx {
    let block_num = raw.header.as_ref().map_or(0, |h| h.number);
    let data: &[Vec<u8>] = raw.data.as_ref().map_or(&[], |d| d.data.as_slice());
    let timestamp = data
        .iter()
        .filter_map(|bytes| envelope::entry(bytes).ok())
        .find(|entry| entry.channel_header.tx_id == tx_id)
        .and_then(|entry| entry.channel_header.timestamp)
        .map_or(0, |ts| ts.seconds);
    FilterTx {
        block_num,
        timestamp,
    }
}
