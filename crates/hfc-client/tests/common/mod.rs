//! In-memory transports and fixtures shared by the client tests.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::{stream, StreamExt};
use hfc_client::config::{ChannelConfig, EndpointConfig};
use hfc_client::grpc::Transports;
use hfc_client::transport::DeliverStream;
use hfc_client::{
    Broadcaster, ClientConfig, ClientError, DeliverMessage, Deliverer, Endorser, FabricClient,
    OrdererHandle, PeerHandle, Result, Signer,
};
use hfc_identity::{EcdsaP256Sha256, Identity, PrivateKey};
use hfc_types::common::{
    Block, BlockData, BlockHeader, BlockMetadata, Envelope, LastConfig, Metadata,
};
use hfc_types::orderer::BroadcastResponse;
use hfc_types::peer::{Endorsement, ProposalResponse, Response, SignedProposal};
use hfc_types::Message;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const CHANNEL: &str = "mychannel";
pub const CHAINCODE: &str = "mycc";

pub fn signer() -> Signer {
    Signer::new(
        Identity::new(b"client-cert".to_vec(), "Org1MSP", PrivateKey::generate()),
        Arc::new(EcdsaP256Sha256),
    )
}

/// A successful endorsement over `payload`, signed with `signature`.
pub fn endorsed(payload: &[u8], signature: &[u8]) -> ProposalResponse {
    ProposalResponse {
        version: 1,
        timestamp: None,
        response: Some(Response {
            status: 200,
            message: String::new(),
            payload: b"result".to_vec(),
        }),
        payload: payload.to_vec(),
        endorsement: Some(Endorsement {
            endorser: b"peer-identity".to_vec(),
            signature: signature.to_vec(),
        }),
    }
}

/// What a mock peer answers.
#[derive(Debug, Clone)]
pub enum Reply {
    Endorse { payload: Vec<u8>, signature: Vec<u8> },
    Status(i32),
    Payload(Vec<u8>),
    Unreachable,
}

/// An endorser that answers from a fixed reply and counts calls.
#[derive(Debug)]
pub struct MockEndorser {
    reply: Reply,
    calls: AtomicUsize,
    last: Mutex<Option<SignedProposal>>,
}

impl MockEndorser {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        })
    }

    pub fn endorsing(payload: &[u8], signature: &[u8]) -> Arc<Self> {
        Self::new(Reply::Endorse {
            payload: payload.to_vec(),
            signature: signature.to_vec(),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_proposal(&self) -> Option<SignedProposal> {
        self.last.lock().clone()
    }
}

#[async_trait]
impl Endorser for MockEndorser {
    async fn process_proposal(&self, proposal: SignedProposal) -> Result<ProposalResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock() = Some(proposal);
        match &self.reply {
            Reply::Endorse { payload, signature } => Ok(endorsed(payload, signature)),
            Reply::Status(status) => Ok(ProposalResponse {
                response: Some(Response {
                    status: *status,
                    message: "chaincode error".into(),
                    payload: Vec::new(),
                }),
                ..Default::default()
            }),
            Reply::Payload(bytes) => Ok(ProposalResponse {
                response: Some(Response {
                    status: 200,
                    message: String::new(),
                    payload: bytes.clone(),
                }),
                ..Default::default()
            }),
            Reply::Unreachable => Err(ClientError::Transport("connection refused".into())),
        }
    }
}

/// An orderer that records every broadcast envelope.
#[derive(Debug)]
pub struct RecordingOrderer {
    status: i32,
    envelopes: Mutex<Vec<Envelope>>,
}

impl RecordingOrderer {
    pub fn new(status: i32) -> Arc<Self> {
        Arc::new(Self {
            status,
            envelopes: Mutex::new(Vec::new()),
        })
    }

    pub fn envelopes(&self) -> Vec<Envelope> {
        self.envelopes.lock().clone()
    }
}

#[async_trait]
impl Broadcaster for RecordingOrderer {
    async fn broadcast(&self, envelope: Envelope) -> Result<BroadcastResponse> {
        self.envelopes.lock().push(envelope);
        Ok(BroadcastResponse {
            status: self.status,
            info: String::new(),
        })
    }
}

/// A deliverer replaying one scripted session per call.
///
/// With `hold_open` the stream stays open after the script instead of
/// ending, like a live peer waiting for new blocks.
pub struct ScriptedDeliverer {
    sessions: Mutex<VecDeque<Vec<Result<DeliverMessage>>>>,
    seeks: Mutex<Vec<Envelope>>,
    hold_open: bool,
    fail_open: bool,
}

impl ScriptedDeliverer {
    pub fn new(sessions: Vec<Vec<Result<DeliverMessage>>>) -> Arc<Self> {
        Self::build(sessions, false, false)
    }

    pub fn held_open(script: Vec<Result<DeliverMessage>>) -> Arc<Self> {
        Self::build(vec![script], true, false)
    }

    pub fn silent() -> Arc<Self> {
        Self::build(Vec::new(), true, false)
    }

    pub fn unreachable() -> Arc<Self> {
        Self::build(Vec::new(), false, true)
    }

    fn build(sessions: Vec<Vec<Result<DeliverMessage>>>, hold_open: bool, fail_open: bool) -> Arc<Self> {
        Arc::new(Self {
            sessions: Mutex::new(sessions.into()),
            seeks: Mutex::new(Vec::new()),
            hold_open,
            fail_open,
        })
    }

    pub fn seeks(&self) -> Vec<Envelope> {
        self.seeks.lock().clone()
    }
}

#[async_trait]
impl Deliverer for ScriptedDeliverer {
    async fn deliver(&self, seek: Envelope) -> Result<DeliverStream> {
        self.seeks.lock().push(seek);
        if self.fail_open {
            return Err(ClientError::Transport("connection refused".into()));
        }
        let script = self.sessions.lock().pop_front().unwrap_or_default();
        let replay = stream::iter(script);
        if self.hold_open {
            Ok(replay.chain(stream::pending()).boxed())
        } else {
            Ok(replay.boxed())
        }
    }
}

/// A decodable block with no transactions whose last config is `last_config`.
pub fn block_with_config(number: u64, last_config: u64) -> Block {
    let last_config = Metadata {
        value: LastConfig { index: last_config }.encode_to_vec(),
        signatures: Vec::new(),
    }
    .encode_to_vec();
    Block {
        header: Some(BlockHeader {
            number,
            previous_hash: vec![0xaa; 32],
            data_hash: vec![0xbb; 32],
        }),
        data: Some(BlockData { data: Vec::new() }),
        metadata: Some(BlockMetadata {
            metadata: vec![Vec::new(), last_config, Vec::new(), Vec::new()],
        }),
    }
}

pub fn block(number: u64) -> Block {
    block_with_config(number, 0)
}

/// A block the decoder refuses.
pub fn headerless_block() -> Block {
    Block {
        header: None,
        data: None,
        metadata: None,
    }
}

pub fn blocks(numbers: &[u64]) -> Vec<Result<DeliverMessage>> {
    numbers.iter().map(|n| Ok(DeliverMessage::Block(block(*n)))).collect()
}

/// One named mock peer.
pub struct MockPeer {
    pub name: &'static str,
    pub org: &'static str,
    pub endorser: Arc<MockEndorser>,
}

pub fn peer(name: &'static str, org: &'static str, endorser: Arc<MockEndorser>) -> MockPeer {
    MockPeer { name, org, endorser }
}

/// A client over mock transports with default channel and chaincode set.
///
/// The orderer and the single event peer both deliver from `deliverer`.
pub fn client(
    peers: &[MockPeer],
    orderer: Arc<RecordingOrderer>,
    deliverer: Arc<ScriptedDeliverer>,
) -> FabricClient {
    client_with_channel(
        peers,
        orderer,
        deliverer,
        ChannelConfig {
            channel_id: CHANNEL.into(),
            chaincode_name: CHAINCODE.into(),
            chaincode_version: "1.0".into(),
            ..Default::default()
        },
    )
}

pub fn client_with_channel(
    peers: &[MockPeer],
    orderer: Arc<RecordingOrderer>,
    deliverer: Arc<ScriptedDeliverer>,
    channel: ChannelConfig,
) -> FabricClient {
    let (config, transports) = client_parts(peers, orderer, deliverer, channel);
    FabricClient::new(config, signer(), transports).expect("mock client")
}

/// Configuration and mock transports for [`client_with_channel`].
pub fn client_parts(
    peers: &[MockPeer],
    orderer: Arc<RecordingOrderer>,
    deliverer: Arc<ScriptedDeliverer>,
    channel: ChannelConfig,
) -> (ClientConfig, Transports) {
    let mut config = ClientConfig {
        channel,
        ..Default::default()
    };
    let mut transports = Transports::default();

    for peer in peers {
        config.peers.insert(
            peer.name.to_string(),
            EndpointConfig {
                url: format!("{}:7051", peer.name),
                org_name: peer.org.to_string(),
                ..Default::default()
            },
        );
        transports.peers.insert(
            peer.name.to_string(),
            PeerHandle {
                endorser: peer.endorser.clone(),
                deliverer: deliverer.clone(),
            },
        );
    }

    config.event_peers.insert(
        "events0".into(),
        EndpointConfig {
            url: "events0:7051".into(),
            org_name: "Org1MSP".into(),
            ..Default::default()
        },
    );
    transports.event_peers.insert(
        "events0".into(),
        PeerHandle {
            endorser: MockEndorser::new(Reply::Unreachable),
            deliverer: deliverer.clone(),
        },
    );

    config.orderers.insert(
        "orderer0".into(),
        EndpointConfig {
            url: "orderer0:7050".into(),
            ..Default::default()
        },
    );
    transports.orderers.insert(
        "orderer0".into(),
        OrdererHandle {
            broadcaster: orderer,
            deliverer,
        },
    );

    (config, transports)
}
