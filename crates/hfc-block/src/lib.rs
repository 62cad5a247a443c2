//! HFC Block Decoder
//!
//! Turns raw ledger blocks into structured records. Decoding is pure: no
//! I/O, no clocks, and the same input always yields the same output.
//!
//! # Views
//!
//! - [`decode_block`]: every transaction with headers, chaincode spec,
//!   endorsements, response, events and read-write sets, plus block
//!   metadata and any channel configuration rendered as JSON.
//! - [`filter_block`]: read-write sets and validation codes only.
//! - [`find_transaction_time`]: locate a transaction's timestamp by id.
//!
//! # Failure containment
//!
//! Metadata slots are decoded independently and fall back to empty values.
//! A transaction that fails to decode is logged and skipped, so the decoded
//! transaction list can be shorter than [`Block::tx_num`]. The validation
//! code vector always has one entry per raw transaction.
//!
//! ```
//! use hfc_block::{decode_block, header_hash};
//! use hfc_types::common::{Block, BlockHeader};
//!
//! let header = BlockHeader { number: 0, previous_hash: vec![], data_hash: vec![] };
//! let raw = Block { header: Some(header.clone()), data: None, metadata: None };
//!
//! let block = decode_block(&raw).unwrap();
//! assert_eq!(block.tx_num, 0);
//! assert_eq!(block.block_hash, header_hash(&header));
//! ```

mod config;
mod decode;
mod envelope;
mod error;
mod filter;
mod hash;
mod metadata;
mod model;

pub use config::config_to_json;
pub use decode::{decode_block, decode_block_bytes};
pub use error::{DecodeError, Result};
pub use filter::{filter_block, find_transaction_time};
pub use hash::{header_bytes, header_hash};
pub use metadata::{last_config_index, validation_codes, NOT_VALIDATED};
pub use model::{
    Block, ChaincodeEvent, ChaincodeRef, ChaincodeResponse, ChaincodeSpec, ChannelHeader,
    ConfigTransaction, Endorsement, EndorserTransaction, FilterBlock, FilterTransaction, FilterTx,
    KvRead, KvWrite, LastConfigMetadata, NsReadWriteSet, OrdererMetadata, SignatureHeader,
    SignatureMetadata, Timestamp, Transaction, TransactionBody,
};
