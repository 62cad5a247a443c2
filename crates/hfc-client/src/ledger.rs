//! Decoding of ledger query results.
//!
//! Ledger queries are ordinary proposals to the query system chaincode; the
//! answer sits in the chaincode response payload.

use crate::endorsement::validate_response;
use crate::error::{decode, Result};
use hfc_block::{filter_block, find_transaction_time, FilterBlock, FilterTx};
use hfc_types::common::{Block, BlockchainInfo};
use hfc_types::peer::ProposalResponse;

/// Ledger query function names.
pub mod functions {
    /// Height and tip hashes of a channel.
    pub const GET_CHAIN_INFO: &str = "GetChainInfo";
    /// A block by number.
    pub const GET_BLOCK_BY_NUMBER: &str = "GetBlockByNumber";
    /// The block containing a transaction.
    pub const GET_BLOCK_BY_TX_ID: &str = "GetBlockByTxID";
}

/// The chaincode response payload of a successful answer from `peer`.
pub fn response_payload<'a>(peer: &str, response: &'a ProposalResponse) -> Result<&'a [u8]> {
    validate_response(peer, response)?;
    Ok(response
        .response
        .as_ref()
        .map(|r| r.payload.as_slice())
        .unwrap_or_default())
}

/// Chain height reported by `GetChainInfo`.
pub fn chain_height(peer: &str, response: &ProposalResponse) -> Result<u64> {
    let info: BlockchainInfo = decode("blockchain info", response_payload(peer, response)?)?;
    Ok(info.height)
}

/// The raw block returned by a block query.
pub fn raw_block(peer: &str, response: &ProposalResponse) -> Result<Block> {
    decode("block", response_payload(peer, response)?)
}

/// The filtered view of the block returned by a block query.
pub fn filtered_block(peer: &str, response: &ProposalResponse) -> Result<FilterBlock> {
    Ok(filter_block(&raw_block(peer, response)?)?)
}

/// Block number and timestamp of `tx_id` within the returned block.
pub fn transaction_time(peer: &str, response: &ProposalResponse, tx_id: &str) -> Result<FilterTx> {
    Ok(find_transaction_time(&raw_block(peer, response)?, tx_id))
}
