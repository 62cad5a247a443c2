//! Transport seam between the client pipeline and the network.
//!
//! The pipeline only sees these traits. [`crate::grpc`] implements them over
//! tonic; tests substitute in-memory doubles.

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use hfc_types::common::{Block, Envelope};
use hfc_types::orderer::BroadcastResponse;
use hfc_types::peer::{FilteredBlock, ProposalResponse, SignedProposal};
use std::sync::Arc;

/// One message received on a Deliver stream.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliverMessage {
    /// A full block.
    Block(Block),
    /// A peer-side filtered block.
    FilteredBlock(FilteredBlock),
    /// Terminal status; the server sends nothing after it.
    Status(i32),
}

/// Stream of Deliver messages. Dropping it tears down the session.
pub type DeliverStream = BoxStream<'static, Result<DeliverMessage>>;

/// Proposal endorsement on a peer.
#[async_trait]
pub trait Endorser: Send + Sync {
    /// Sends a signed proposal and waits for the peer's response.
    async fn process_proposal(&self, proposal: SignedProposal) -> Result<ProposalResponse>;
}

/// Transaction submission to an ordering service.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Sends one envelope and reads exactly one acknowledgment.
    async fn broadcast(&self, envelope: Envelope) -> Result<BroadcastResponse>;
}

/// Position-addressed block delivery.
#[async_trait]
pub trait Deliverer: Send + Sync {
    /// Opens a Deliver session for a signed seek envelope.
    async fn deliver(&self, seek: Envelope) -> Result<DeliverStream>;
}

/// A peer node: endorses proposals and streams blocks.
#[derive(Clone)]
pub struct PeerHandle {
    /// Endorsement service.
    pub endorser: Arc<dyn Endorser>,
    /// Block event service.
    pub deliverer: Arc<dyn Deliverer>,
}

/// An ordering node: accepts transactions and serves blocks.
#[derive(Clone)]
pub struct OrdererHandle {
    /// Broadcast service.
    pub broadcaster: Arc<dyn Broadcaster>,
    /// Deliver service.
    pub deliverer: Arc<dyn Deliverer>,
}

impl std::fmt::Debug for PeerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerHandle").finish_non_exhaustive()
    }
}

impl std::fmt::Debug for OrdererHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdererHandle").finish_non_exhaustive()
    }
}
