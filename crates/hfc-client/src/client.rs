//! The client facade.
//!
//! [`FabricClient`] wires the configuration, the signing identity and the
//! transports into the submission, query, administration and event
//! operations. It holds no mutable state, so one client can serve many
//! concurrent tasks.

use crate::channel::config_update_envelope;
use crate::config::ClientConfig;
use crate::deliver::DeliverClient;
use crate::endorsement::{require_all, require_first, EndorsementCollector, EndorserTarget};
use crate::error::{decode, ClientError, Result};
use crate::event::{BlockEvent, DecodeMode, EventListener, ListenerState};
use crate::grpc::Transports;
use crate::ledger::{self, functions};
use crate::proposal::{ChaincodeDefinition, ChaincodeRequest, Proposal, ProposalBuilder};
use crate::selector::TargetSelector;
use crate::signer::Signer;
use crate::transaction::{assemble, broadcast};
use crate::transport::{OrdererHandle, PeerHandle};
use hfc_block::{FilterBlock, FilterTx};
use hfc_identity::{suite_for, Identity};
use hfc_types::common;
use hfc_types::lifecycle::{CheckCommitReadinessResult, InstallChaincodeResult};
use hfc_types::peer::ProposalResponse;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Outcome of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeResponse {
    /// Transaction id.
    pub tx_id: String,
    /// Chaincode response status from the endorsers.
    pub status: i32,
    /// Chaincode response payload from the endorsers.
    pub payload: Vec<u8>,
}

/// Outcome of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResponse {
    /// Transaction id of the query proposal.
    pub tx_id: String,
    /// Peer that answered.
    pub peer: String,
    /// Chaincode response status.
    pub status: i32,
    /// Chaincode response payload.
    pub payload: Vec<u8>,
}

/// A running block event subscription.
///
/// Dropping it stops the stream.
#[derive(Debug)]
pub struct Subscription {
    listener: EventListener,
    events: mpsc::Receiver<BlockEvent>,
}

impl Subscription {
    /// Next block, or `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<BlockEvent> {
        self.events.recv().await
    }

    /// Listener state.
    pub fn state(&self) -> ListenerState {
        self.listener.state()
    }

    /// Stops the stream.
    pub fn cancel(&self) {
        self.listener.cancel();
    }

    /// Waits for the receive loop to end and returns the final state.
    pub async fn finished(&mut self) -> ListenerState {
        self.listener.finished().await;
        self.listener.state()
    }
}

/// Client for one identity on one network.
#[derive(Debug)]
pub struct FabricClient {
    config: ClientConfig,
    signer: Signer,
    transports: Transports,
    selector: TargetSelector,
    builder: ProposalBuilder,
    collector: EndorsementCollector,
    deliver: DeliverClient,
}

impl FabricClient {
    /// Validates `config` and prepares gRPC connections for `identity`.
    ///
    /// Connections are dialed on first use. Must be called within a tokio
    /// runtime.
    pub fn connect(config: ClientConfig, identity: Identity) -> Result<Self> {
        let crypto = &config.crypto;
        let suite = suite_for(&crypto.family, &crypto.algorithm, &crypto.hash)?;
        let signer = Signer::new(identity, Arc::from(suite));
        let transports = Transports::connect_lazy(&config)?;
        let client = Self::new(config, signer, transports)?;
        info!(
            peers = client.config.peers.len(),
            orderers = client.config.orderers.len(),
            msp = %client.signer.msp_id(),
            "client ready"
        );
        Ok(client)
    }

    /// Validates `config` and creates a client over explicit transports.
    pub fn new(config: ClientConfig, signer: Signer, transports: Transports) -> Result<Self> {
        config.validate()?;
        let selector = TargetSelector::from_config(&config)?;
        let timeouts = &config.timeouts;
        Ok(Self {
            builder: ProposalBuilder::new(signer.clone()),
            collector: EndorsementCollector::new(timeouts.request()),
            deliver: DeliverClient::new(signer.clone(), timeouts.deliver()),
            selector,
            signer,
            transports,
            config,
        })
    }

    /// The configuration in force.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The signing identity.
    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// Endorses, assembles and broadcasts a chaincode invocation.
    ///
    /// # Errors
    ///
    /// [`ClientError::EndorsementFailed`] if any selected peer fails, in which
    /// case nothing is broadcast; otherwise any assembly or broadcast error.
    pub async fn invoke(&self, request: &ChaincodeRequest) -> Result<InvokeResponse> {
        let request = self.resolve(request)?;
        let proposal = self.builder.invocation(&request)?;
        info!(tx_id = %proposal.tx_id(), chaincode = %request.name, "invoking chaincode");
        self.submit(&proposal, &self.selector.select_peers()?).await
    }

    /// Evaluates a chaincode call on the first selected peer without
    /// submitting it.
    pub async fn query(&self, request: &ChaincodeRequest) -> Result<QueryResponse> {
        let request = self.resolve(request)?;
        let proposal = self.builder.invocation(&request)?;
        let (peer, response) = self.evaluate(&proposal, &self.first_peer()?).await?;
        let inner = response.response.unwrap_or_default();
        Ok(QueryResponse {
            tx_id: proposal.tx_id().id().to_string(),
            peer,
            status: inner.status,
            payload: inner.payload,
        })
    }

    /// Installs a pre-built code package on `peers` through the legacy
    /// lifecycle.
    ///
    /// Returns each peer's response, in order.
    pub async fn install_chaincode(
        &self,
        request: &ChaincodeRequest,
        code_package: Vec<u8>,
        peers: &[String],
    ) -> Result<Vec<(String, ProposalResponse)>> {
        let proposal = self.builder.install(request, code_package)?;
        info!(chaincode = %request.name, peers = peers.len(), "installing chaincode");
        let targets = self.endorsers(peers)?;
        require_all(self.collector.collect(&targets, proposal.signed()).await)
    }

    /// Deploys (`"deploy"`) or upgrades (`"upgrade"`) a chaincode through the
    /// legacy lifecycle.
    ///
    /// `collection_config` is a serialized private data collection package.
    pub async fn instantiate_chaincode(
        &self,
        request: &ChaincodeRequest,
        operation: &str,
        policy: Option<&str>,
        collection_config: Option<Vec<u8>>,
    ) -> Result<InvokeResponse> {
        let request = self.resolve(request)?;
        let proposal = self
            .builder
            .instantiate(&request, operation, policy, collection_config)?;
        info!(chaincode = %request.name, operation, "instantiating chaincode");
        self.submit(&proposal, &self.selector.select_peers()?).await
    }

    /// Installs a lifecycle chaincode package on `peer`.
    pub async fn lifecycle_install(
        &self,
        package: Vec<u8>,
        peer: &str,
    ) -> Result<InstallChaincodeResult> {
        let proposal = self.builder.lifecycle_install(package)?;
        let (peer, response) = self.evaluate(&proposal, peer).await?;
        let result: InstallChaincodeResult =
            decode("install result", ledger::response_payload(&peer, &response)?)?;
        info!(peer = %peer, package_id = %result.package_id, "chaincode package installed");
        Ok(result)
    }

    /// Approves a chaincode definition for the submitter's organization.
    pub async fn approve_for_my_org(
        &self,
        channel_id: &str,
        definition: &ChaincodeDefinition,
        package_id: &str,
    ) -> Result<InvokeResponse> {
        let channel_id = self.channel_or_default(channel_id)?;
        let proposal = self
            .builder
            .approve_for_my_org(&channel_id, definition, package_id)?;
        self.submit(&proposal, &self.selector.select_peers()?).await
    }

    /// Commits a chaincode definition to the channel.
    pub async fn commit_chaincode_definition(
        &self,
        channel_id: &str,
        definition: &ChaincodeDefinition,
    ) -> Result<InvokeResponse> {
        let channel_id = self.channel_or_default(channel_id)?;
        let proposal = self.builder.commit_definition(&channel_id, definition)?;
        self.submit(&proposal, &self.selector.select_peers()?).await
    }

    /// Which organizations have approved a chaincode definition.
    pub async fn check_commit_readiness(
        &self,
        channel_id: &str,
        definition: &ChaincodeDefinition,
    ) -> Result<HashMap<String, bool>> {
        let channel_id = self.channel_or_default(channel_id)?;
        let proposal = self.builder.check_commit_readiness(&channel_id, definition)?;
        let (peer, response) = self.evaluate(&proposal, &self.first_peer()?).await?;
        let result: CheckCommitReadinessResult =
            decode("commit readiness", ledger::response_payload(&peer, &response)?)?;
        Ok(result.approvals)
    }

    /// Signs a channel creation or update transaction and broadcasts it.
    ///
    /// `envelope_bytes` is a serialized `CONFIG_UPDATE` envelope.
    pub async fn create_update_channel(&self, envelope_bytes: &[u8], channel_id: &str) -> Result<()> {
        let envelope = config_update_envelope(envelope_bytes, channel_id, &self.signer)?;
        info!(channel = %channel_id, "submitting channel update");
        broadcast(self.orderer()?.broadcaster.as_ref(), envelope).await
    }

    /// Joins `peer` to `channel_id` using the channel's genesis block.
    pub async fn join_channel(&self, channel_id: &str, peer: &str) -> Result<()> {
        let channel_id = self.channel_or_default(channel_id)?;
        let genesis = self.genesis_block(&channel_id).await?;
        let proposal = self.builder.join_channel(&genesis)?;
        self.evaluate(&proposal, peer).await?;
        info!(channel = %channel_id, peer, "peer joined channel");
        Ok(())
    }

    /// The genesis block of `channel_id`, from an orderer.
    pub async fn genesis_block(&self, channel_id: &str) -> Result<common::Block> {
        let channel_id = self.channel_or_default(channel_id)?;
        let orderer = self.orderer()?;
        self.deliver
            .genesis_block(orderer.deliverer.as_ref(), &channel_id)
            .await
    }

    /// The configuration block in force for `channel_id`, from an orderer.
    pub async fn last_config_block(&self, channel_id: &str) -> Result<common::Block> {
        let channel_id = self.channel_or_default(channel_id)?;
        let orderer = self.orderer()?;
        self.deliver
            .last_config_block(orderer.deliverer.as_ref(), &channel_id)
            .await
    }

    /// Block `number` of `channel_id`, filtered.
    pub async fn block_by_number(&self, channel_id: &str, number: u64) -> Result<FilterBlock> {
        let channel_id = self.channel_or_default(channel_id)?;
        let number = number.to_string();
        let (peer, response) = self
            .ledger_query(&channel_id, functions::GET_BLOCK_BY_NUMBER, &[channel_id.as_str(), number.as_str()])
            .await?;
        ledger::filtered_block(&peer, &response)
    }

    /// The block containing `tx_id`, filtered.
    pub async fn block_by_tx_id(&self, channel_id: &str, tx_id: &str) -> Result<FilterBlock> {
        let channel_id = self.channel_or_default(channel_id)?;
        let (peer, response) = self
            .ledger_query(&channel_id, functions::GET_BLOCK_BY_TX_ID, &[channel_id.as_str(), tx_id])
            .await?;
        ledger::filtered_block(&peer, &response)
    }

    /// Height of `channel_id` as seen by an endorsing peer.
    pub async fn block_height(&self, channel_id: &str) -> Result<u64> {
        let channel_id = self.channel_or_default(channel_id)?;
        let (peer, response) = self
            .ledger_query(&channel_id, functions::GET_CHAIN_INFO, &[channel_id.as_str()])
            .await?;
        ledger::chain_height(&peer, &response)
    }

    /// Height of `channel_id` as seen by the first event peer.
    pub async fn block_height_by_event_peer(&self, channel_id: &str) -> Result<u64> {
        let channel_id = self.channel_or_default(channel_id)?;
        let (name, handle) = self.event_peer()?;
        let proposal =
            self.builder
                .ledger_query(&channel_id, functions::GET_CHAIN_INFO, &[channel_id.as_str()])?;
        let target = EndorserTarget {
            name: name.to_string(),
            endorser: Arc::clone(&handle.endorser),
        };
        let (peer, response) =
            require_first(self.collector.collect(&[target], proposal.signed()).await)?;
        ledger::chain_height(&peer, &response)
    }

    /// Block number and timestamp of `tx_id`.
    pub async fn transaction_time(&self, channel_id: &str, tx_id: &str) -> Result<FilterTx> {
        let channel_id = self.channel_or_default(channel_id)?;
        let (peer, response) = self
            .ledger_query(&channel_id, functions::GET_BLOCK_BY_TX_ID, &[channel_id.as_str(), tx_id])
            .await?;
        ledger::transaction_time(&peer, &response, tx_id)
    }

    /// Streams fully decoded blocks from the first event peer.
    ///
    /// `start: None` begins at the current tip.
    pub async fn listen_full_blocks(
        &self,
        channel_id: &str,
        start: Option<u64>,
    ) -> Result<Subscription> {
        self.subscribe(channel_id, start, DecodeMode::Full).await
    }

    /// Streams filtered blocks from the first event peer.
    ///
    /// `start: None` begins at the current tip.
    pub async fn listen_filtered_blocks(
        &self,
        channel_id: &str,
        start: Option<u64>,
    ) -> Result<Subscription> {
        self.subscribe(channel_id, start, DecodeMode::Filtered).await
    }

    async fn subscribe(
        &self,
        channel_id: &str,
        start: Option<u64>,
        mode: DecodeMode,
    ) -> Result<Subscription> {
        let channel_id = self.channel_or_default(channel_id)?;
        let (name, handle) = self.event_peer()?;
        let mut listener = EventListener::new(
            self.signer.clone(),
            Arc::clone(&handle.deliverer),
            channel_id,
            mode,
        );
        match start {
            Some(number) => listener.seek_range(number, u64::MAX)?,
            None => listener.seek_newest()?,
        }
        let events = listener.listen().await?;
        debug!(peer = %name, ?mode, "subscription started");
        Ok(Subscription { listener, events })
    }

    async fn submit(&self, proposal: &Proposal, peers: &[String]) -> Result<InvokeResponse> {
        let targets = self.endorsers(peers)?;
        let orderer = self.orderer()?;
        let responses = require_all(self.collector.collect(&targets, proposal.signed()).await)?;
        let envelope = assemble(proposal, &responses, &self.signer)?;

        broadcast(orderer.broadcaster.as_ref(), envelope).await?;

        let inner = responses
            .into_iter()
            .next()
            .and_then(|(_, response)| response.response)
            .unwrap_or_default();
        info!(tx_id = %proposal.tx_id(), "transaction submitted");
        Ok(InvokeResponse {
            tx_id: proposal.tx_id().id().to_string(),
            status: inner.status,
            payload: inner.payload,
        })
    }

    async fn evaluate(&self, proposal: &Proposal, peer: &str) -> Result<(String, ProposalResponse)> {
        let targets = self.endorsers(&[peer.to_string()])?;
        require_first(self.collector.collect(&targets, proposal.signed()).await)
    }

    async fn ledger_query(
        &self,
        channel_id: &str,
        function: &str,
        args: &[&str],
    ) -> Result<(String, ProposalResponse)> {
        let proposal = self.builder.ledger_query(channel_id, function, args)?;
        self.evaluate(&proposal, &self.first_peer()?).await
    }

    fn resolve(&self, request: &ChaincodeRequest) -> Result<ChaincodeRequest> {
        let mut request = request.clone();
        request.channel_id = self.channel_or_default(&request.channel_id)?;
        if request.name.is_empty() {
            request.name = self.config.channel.chaincode_name.clone();
            if request.version.is_empty() {
                request.version = self.config.channel.chaincode_version.clone();
            }
        }
        if request.name.is_empty() {
            return Err(ClientError::InvalidOperation(
                "no chaincode name given or configured".to_string(),
            ));
        }
        Ok(request)
    }

    fn channel_or_default(&self, channel_id: &str) -> Result<String> {
        let channel_id = if channel_id.is_empty() {
            self.config.channel.channel_id.as_str()
        } else {
            channel_id
        };
        if channel_id.is_empty() {
            return Err(ClientError::InvalidOperation(
                "no channel given or configured".to_string(),
            ));
        }
        Ok(channel_id.to_string())
    }

    fn first_peer(&self) -> Result<String> {
        self.selector
            .select_peers()?
            .into_iter()
            .next()
            .ok_or(ClientError::NoPeersConfigured)
    }

    fn endorsers(&self, names: &[String]) -> Result<Vec<EndorserTarget>> {
        names
            .iter()
            .map(|name| -> Result<EndorserTarget> {
                let handle = self
                    .transports
                    .peers
                    .get(name)
                    .ok_or_else(|| ClientError::UnknownPeer(name.clone()))?;
                Ok(EndorserTarget {
                    name: name.clone(),
                    endorser: Arc::clone(&handle.endorser),
                })
            })
            .collect()
    }

    fn orderer(&self) -> Result<&OrdererHandle> {
        let name = self.selector.select_orderer()?;
        debug!(orderer = %name, "selected orderer");
        self.transports
            .orderers
            .get(&name)
            .ok_or(ClientError::UnknownOrderer(name))
    }

    fn event_peer(&self) -> Result<(&str, &PeerHandle)> {
        let name = self
            .config
            .event_peers
            .keys()
            .next()
            .ok_or(ClientError::NoPeersConfigured)?;
        let handle = self
            .transports
            .event_peers
            .get(name)
            .ok_or_else(|| ClientError::UnknownPeer(name.clone()))?;
        Ok((name.as_str(), handle))
    }
}
