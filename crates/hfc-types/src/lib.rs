//! Wire messages for the permissioned-ledger transaction protocol.
//!
//! Every message here is declared by hand with `prost` derives so that the
//! crate builds without a protobuf compiler. Field tags match the canonical
//! `.proto` definitions exactly; anything the client never reads or writes is
//! left out and is skipped as an unknown field on decode.
//!
//! Modules follow the protobuf packages:
//!
//! - [`common`]: envelopes, headers, blocks, channel configuration, policies
//! - [`msp`]: serialized identities and policy principals
//! - [`peer`]: proposals, responses, transactions, filtered blocks
//! - [`orderer`]: broadcast and deliver messages
//! - [`rwset`]: read-write sets recorded by endorsers
//! - [`lifecycle`]: chaincode lifecycle arguments and results

pub mod common;
pub mod lifecycle;
pub mod msp;
pub mod orderer;
pub mod peer;
pub mod rwset;

pub use prost::Message;
pub use prost_types::Timestamp;

/// Name of the legacy lifecycle system chaincode.
pub const LSCC: &str = "lscc";

/// Name of the configuration system chaincode.
pub const CSCC: &str = "cscc";

/// Name of the query system chaincode.
pub const QSCC: &str = "qscc";

/// Name of the new lifecycle chaincode.
pub const LIFECYCLE: &str = "_lifecycle";
