//! Decoded block records.
//!
//! These types are the structured view handed to applications. Byte fields
//! serialize as lowercase hex.

use serde::Serialize;

/// Serializes byte fields as hex strings.
pub(crate) mod hex_bytes {
    use serde::Serializer;

    pub fn serialize<T: AsRef<[u8]>, S: Serializer>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes.as_ref()))
    }
}

/// Seconds and nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timestamp {
    /// Whole seconds.
    pub seconds: i64,
    /// Sub-second nanoseconds.
    pub nanos: i32,
}

impl From<&hfc_types::Timestamp> for Timestamp {
    fn from(ts: &hfc_types::Timestamp) -> Self {
        Self {
            seconds: ts.seconds,
            nanos: ts.nanos,
        }
    }
}

/// Creator identity and nonce of a signed message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SignatureHeader {
    /// MSP of the signer; empty if the creator could not be decoded.
    pub msp_id: String,
    /// PEM certificate of the signer.
    pub certificate: String,
    /// Anti-replay nonce.
    #[serde(serialize_with = "hex_bytes::serialize")]
    pub nonce: Vec<u8>,
}

/// Signature found in a metadata slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureMetadata {
    /// Header of the first signature in the slot.
    pub signature_header: SignatureHeader,
    /// Signature bytes.
    #[serde(serialize_with = "hex_bytes::serialize")]
    pub signature: Vec<u8>,
}

/// Contents of the last-config metadata slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LastConfigMetadata {
    /// Number of the most recent configuration block.
    pub last_config_block_num: u64,
    /// Orderer signature over the slot, if any.
    pub signature_data: Option<SignatureMetadata>,
}

/// Contents of the orderer metadata slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrdererMetadata {
    /// Last persisted ordering offset.
    pub last_offset_persisted: u64,
    /// Orderer signature over the slot, if any.
    pub signature_data: Option<SignatureMetadata>,
}

/// Chaincode coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChaincodeRef {
    pub path: String,
    pub name: String,
    pub version: String,
}

impl From<&hfc_types::peer::ChaincodeId> for ChaincodeRef {
    fn from(id: &hfc_types::peer::ChaincodeId) -> Self {
        Self {
            path: id.path.clone(),
            name: id.name.clone(),
            version: id.version.clone(),
        }
    }
}

/// Decoded channel header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelHeader {
    /// Raw `HeaderType` value.
    pub header_type: i32,
    pub version: i32,
    pub timestamp: Option<Timestamp>,
    pub channel_id: String,
    pub tx_id: String,
    pub epoch: u64,
    /// Chaincode named in the header extension.
    pub chaincode_id: Option<ChaincodeRef>,
}

/// Invocation recorded in an endorser transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChaincodeSpec {
    /// Raw `ChaincodeType` value.
    pub chaincode_type: i32,
    pub chaincode_id: Option<ChaincodeRef>,
    /// Arguments rendered as (lossy) UTF-8.
    pub args: Vec<String>,
    pub timeout: i32,
}

/// One endorser's signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endorsement {
    pub signature_header: SignatureHeader,
    #[serde(serialize_with = "hex_bytes::serialize")]
    pub signature: Vec<u8>,
}

/// Chaincode response captured by the endorsers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChaincodeResponse {
    pub status: i32,
    pub message: String,
    #[serde(serialize_with = "hex_bytes::serialize")]
    pub payload: Vec<u8>,
}

/// Event emitted by the chaincode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChaincodeEvent {
    pub chaincode_id: String,
    pub tx_id: String,
    pub event_name: String,
    #[serde(serialize_with = "hex_bytes::serialize")]
    pub payload: Vec<u8>,
}

/// A key read with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KvRead {
    pub key: String,
    /// `(block_num, tx_num)` of the committed version; `None` if absent.
    pub version: Option<(u64, u64)>,
}

/// A key written or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KvWrite {
    pub key: String,
    pub is_delete: bool,
    #[serde(serialize_with = "hex_bytes::serialize")]
    pub value: Vec<u8>,
}

/// Read-write set of a single chaincode namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NsReadWriteSet {
    pub namespace: String,
    pub reads: Vec<KvRead>,
    pub writes: Vec<KvWrite>,
    /// Keys whose metadata was written.
    pub metadata_writes: Vec<String>,
    pub range_queries: usize,
}

/// Detail specific to endorser transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EndorserTransaction {
    /// Signer of the first transaction action.
    pub action_signature_header: SignatureHeader,
    pub chaincode_spec: ChaincodeSpec,
    pub endorsements: Vec<Endorsement>,
    #[serde(serialize_with = "hex_bytes::serialize")]
    pub proposal_hash: Vec<u8>,
    pub response: Option<ChaincodeResponse>,
    pub events: Option<ChaincodeEvent>,
    pub ns_rw_sets: Vec<NsReadWriteSet>,
}

/// Detail specific to configuration transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigTransaction {
    /// Same as the envelope signer for configuration transactions.
    pub action_signature_header: SignatureHeader,
    /// SHA-256 of the last config update payload.
    #[serde(serialize_with = "hex_bytes::serialize")]
    pub proposal_hash: Vec<u8>,
    /// Channel header of the last config update.
    pub last_update_channel_header: ChannelHeader,
    /// JSON snapshot of the channel configuration.
    pub config: serde_json::Value,
}

/// The two kinds of transaction the decoder understands.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionBody {
    Endorser(Box<EndorserTransaction>),
    Config(Box<ConfigTransaction>),
}

/// A fully decoded transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// Position of the transaction among the block's raw entries.
    pub index: usize,
    #[serde(serialize_with = "hex_bytes::serialize")]
    pub signature: Vec<u8>,
    pub channel_header: ChannelHeader,
    pub signature_header: SignatureHeader,
    pub validation_code: u8,
    pub validation_code_name: String,
    /// Serialized size of the envelope.
    pub size: usize,
    #[serde(flatten)]
    pub body: TransactionBody,
}

impl Transaction {
    /// Returns the endorser detail, if this is an endorser transaction.
    pub fn as_endorser(&self) -> Option<&EndorserTransaction> {
        match &self.body {
            TransactionBody::Endorser(tx) => Some(tx),
            TransactionBody::Config(_) => None,
        }
    }

    /// Returns the configuration detail, if this is a configuration transaction.
    pub fn as_config(&self) -> Option<&ConfigTransaction> {
        match &self.body {
            TransactionBody::Config(tx) => Some(tx),
            TransactionBody::Endorser(_) => None,
        }
    }

    /// True if the committing peers marked this transaction valid.
    pub fn is_valid(&self) -> bool {
        self.validation_code == 0
    }
}

/// A fully decoded block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub number: u64,
    #[serde(serialize_with = "hex_bytes::serialize")]
    pub previous_hash: Vec<u8>,
    #[serde(serialize_with = "hex_bytes::serialize")]
    pub data_hash: Vec<u8>,
    #[serde(serialize_with = "hex_bytes::serialize")]
    pub block_hash: Vec<u8>,
    /// Channel of the last decoded transaction.
    pub channel_id: String,
    /// Number of raw transaction entries.
    pub tx_num: usize,
    /// Successfully decoded transactions; may be shorter than `tx_num`.
    pub transactions: Vec<Transaction>,
    pub creator_signature: Option<SignatureMetadata>,
    pub last_config: LastConfigMetadata,
    /// One validation code per raw entry.
    #[serde(serialize_with = "hex_bytes::serialize")]
    pub transaction_filter: Vec<u8>,
    pub orderer_metadata: OrdererMetadata,
    /// Channel-header time of the first entry.
    pub first_tx_time: Option<Timestamp>,
    /// Serialized size of the raw block.
    pub size: usize,
    /// Configuration snapshot if the block carries a config transaction.
    pub config: Option<serde_json::Value>,
}

/// Reduced per-transaction projection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterTransaction {
    pub index: usize,
    pub tx_id: String,
    pub ns_rw_sets: Vec<NsReadWriteSet>,
    pub validation_code: u8,
    pub validation_code_name: String,
    pub size: usize,
}

/// Reduced block view used by ledger queries and filtered subscriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterBlock {
    pub tx_num: usize,
    pub block_num: u64,
    #[serde(serialize_with = "hex_bytes::serialize")]
    pub block_hash: Vec<u8>,
    #[serde(serialize_with = "hex_bytes::serialize")]
    pub pre_block_hash: Vec<u8>,
    pub last_config_block: u64,
    /// Data hash of the block.
    #[serde(serialize_with = "hex_bytes::serialize")]
    pub tx_hash: Vec<u8>,
    #[serde(serialize_with = "hex_bytes::serialize")]
    pub transaction_filter: Vec<u8>,
    pub transactions: Vec<FilterTransaction>,
}

/// Location and time of a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterTx {
    pub block_num: u64,
    /// Channel-header seconds; zero if the transaction was not found.
    pub timestamp: i64,
}
