//! gRPC transports over tonic.
//!
//! Messages are encoded with the prost codec directly against the service
//! paths; no generated stubs are involved. Peer and broadcast channels
//! connect lazily and are reused across calls. Orderer Deliver sessions dial
//! a fresh connection per call.

use crate::config::{ClientConfig, EndpointConfig, TimeoutConfig};
use crate::error::{ClientError, Result};
use crate::transport::{
    Broadcaster, DeliverMessage, DeliverStream, Deliverer, Endorser, OrdererHandle, PeerHandle,
};
use async_trait::async_trait;
use futures::{stream, StreamExt};
use hfc_block::DecodeError;
use hfc_types::common::Envelope;
use hfc_types::orderer::{self, BroadcastResponse};
use hfc_types::peer::{self, ProposalResponse, SignedProposal};
use std::collections::HashMap;
use std::sync::Arc;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};
use tracing::debug;

/// Largest message accepted or sent, in bytes.
pub const MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

const PROCESS_PROPOSAL: &str = "/protos.Endorser/ProcessProposal";
const PEER_DELIVER: &str = "/protos.Deliver/Deliver";
const BROADCAST: &str = "/orderer.AtomicBroadcast/Broadcast";
const ORDERER_DELIVER: &str = "/orderer.AtomicBroadcast/Deliver";

/// Builds a tonic endpoint for `config`.
///
/// A bare `host:port` gets an `http` or `https` scheme depending on
/// `use_tls`. TLS without a configured CA trusts the webpki root set. `request_timeout` bounds unary calls; pass `None` for
/// long-lived streams.
pub fn endpoint(
    config: &EndpointConfig,
    timeouts: &TimeoutConfig,
    request_timeout: Option<std::time::Duration>,
) -> Result<Endpoint> {
    let url = if config.url.contains("://") {
        config.url.clone()
    } else if config.use_tls {
        format!("https://{}", config.url)
    } else {
        format!("http://{}", config.url)
    };

    let mut endpoint = Endpoint::from_shared(url.clone())
        .map_err(|e| ClientError::Config(format!("invalid endpoint {url}: {e}")))?
        .connect_timeout(timeouts.connect())
        .http2_keep_alive_interval(timeouts.keepalive_interval())
        .keep_alive_timeout(timeouts.keepalive_timeout())
        .keep_alive_while_idle(true);
    if let Some(timeout) = request_timeout {
        endpoint = endpoint.timeout(timeout);
    }

    if config.use_tls {
        let mut tls = match &config.tls_ca_pem {
            Some(pem) => ClientTlsConfig::new().ca_certificate(Certificate::from_pem(pem)),
            None => ClientTlsConfig::new().with_webpki_roots(),
        };
        if let Some(domain) = &config.domain_name {
            tls = tls.domain_name(domain.clone());
        }
        endpoint = endpoint.tls_config(tls)?;
    }
    Ok(endpoint)
}

fn grpc(channel: Channel) -> Grpc<Channel> {
    Grpc::new(channel)
        .max_decoding_message_size(MAX_MESSAGE_SIZE)
        .max_encoding_message_size(MAX_MESSAGE_SIZE)
}

/// A peer reached over gRPC.
#[derive(Debug, Clone)]
pub struct GrpcPeer {
    name: String,
    unary: Channel,
    streaming: Channel,
}

impl GrpcPeer {
    /// Prepares channels to the peer without dialing yet.
    pub fn connect_lazy(name: &str, config: &EndpointConfig, timeouts: &TimeoutConfig) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            unary: endpoint(config, timeouts, Some(timeouts.request()))?.connect_lazy(),
            streaming: endpoint(config, timeouts, None)?.connect_lazy(),
        })
    }

    /// Peer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Both services of this peer.
    pub fn handle(self) -> PeerHandle {
        let peer = Arc::new(self);
        PeerHandle {
            endorser: peer.clone(),
            deliverer: peer,
        }
    }
}

#[async_trait]
impl Endorser for GrpcPeer {
    async fn process_proposal(&self, proposal: SignedProposal) -> Result<ProposalResponse> {
        let mut client = grpc(self.unary.clone());
        client.ready().await?;
        let codec: ProstCodec<SignedProposal, ProposalResponse> = ProstCodec::default();
        let response = client
            .unary(
                tonic::Request::new(proposal),
                PathAndQuery::from_static(PROCESS_PROPOSAL),
                codec,
            )
            .await?;
        debug!(peer = %self.name, "proposal response received");
        Ok(response.into_inner())
    }
}

#[async_trait]
impl Deliverer for GrpcPeer {
    async fn deliver(&self, seek: Envelope) -> Result<DeliverStream> {
        let mut client = grpc(self.streaming.clone());
        client.ready().await?;
        let codec: ProstCodec<Envelope, peer::DeliverResponse> = ProstCodec::default();
        // The peer ends the session when the request side closes.
        let outbound = stream::iter([seek]).chain(stream::pending());
        let response = client
            .streaming(
                tonic::Request::new(outbound),
                PathAndQuery::from_static(PEER_DELIVER),
                codec,
            )
            .await?;
        debug!(peer = %self.name, "event stream open");

        Ok(response
            .into_inner()
            .map(|item| -> Result<DeliverMessage> {
                use peer::deliver_response::Type;
                match item?.r#type {
                    Some(Type::Block(block)) => Ok(DeliverMessage::Block(block)),
                    Some(Type::FilteredBlock(block)) => Ok(DeliverMessage::FilteredBlock(block)),
                    Some(Type::Status(status)) => Ok(DeliverMessage::Status(status)),
                    None => Err(DecodeError::Missing("deliver response type").into()),
                }
            })
            .boxed())
    }
}

/// An ordering node reached over gRPC.
#[derive(Debug, Clone)]
pub struct GrpcOrderer {
    name: String,
    broadcast: Channel,
    deliver: Endpoint,
}

impl GrpcOrderer {
    /// Prepares the broadcast channel without dialing yet.
    pub fn connect_lazy(name: &str, config: &EndpointConfig, timeouts: &TimeoutConfig) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            broadcast: endpoint(config, timeouts, Some(timeouts.request()))?.connect_lazy(),
            deliver: endpoint(config, timeouts, None)?,
        })
    }

    /// Orderer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Both services of this orderer.
    pub fn handle(self) -> OrdererHandle {
        let orderer = Arc::new(self);
        OrdererHandle {
            broadcaster: orderer.clone(),
            deliverer: orderer,
        }
    }
}

#[async_trait]
impl Broadcaster for GrpcOrderer {
    async fn broadcast(&self, envelope: Envelope) -> Result<BroadcastResponse> {
        let mut client = grpc(self.broadcast.clone());
        client.ready().await?;
        let codec: ProstCodec<Envelope, BroadcastResponse> = ProstCodec::default();
        let response = client
            .streaming(
                tonic::Request::new(stream::iter([envelope])),
                PathAndQuery::from_static(BROADCAST),
                codec,
            )
            .await?;
        let ack = response.into_inner().message().await?.ok_or_else(|| {
            ClientError::Transport(format!("{}: broadcast closed without acknowledgment", self.name))
        })?;
        debug!(orderer = %self.name, status = ack.status, "broadcast acknowledged");
        Ok(ack)
    }
}

#[async_trait]
impl Deliverer for GrpcOrderer {
    async fn deliver(&self, seek: Envelope) -> Result<DeliverStream> {
        let channel = self.deliver.connect().await?;
        let mut client = grpc(channel.clone());
        let codec: ProstCodec<Envelope, orderer::DeliverResponse> = ProstCodec::default();
        let response = client
            .streaming(
                tonic::Request::new(stream::iter([seek])),
                PathAndQuery::from_static(ORDERER_DELIVER),
                codec,
            )
            .await?;
        debug!(orderer = %self.name, "deliver session open");

        Ok(response
            .into_inner()
            .map(move |item| -> Result<DeliverMessage> {
                // Holding the channel keeps the dedicated connection alive.
                let _connection = &channel;
                use orderer::deliver_response::Type;
                match item?.r#type {
                    Some(Type::Block(block)) => Ok(DeliverMessage::Block(block)),
                    Some(Type::Status(status)) => Ok(DeliverMessage::Status(status)),
                    None => Err(DecodeError::Missing("deliver response type").into()),
                }
            })
            .boxed())
    }
}

/// Every configured node, ready to use.
#[derive(Debug, Clone, Default)]
pub struct Transports {
    /// Endorsing peers by name.
    pub peers: HashMap<String, PeerHandle>,
    /// Event peers by name.
    pub event_peers: HashMap<String, PeerHandle>,
    /// Orderers by name.
    pub orderers: HashMap<String, OrdererHandle>,
}

impl Transports {
    /// Prepares lazy gRPC connections for every endpoint in `config`.
    ///
    /// Must be called within a tokio runtime.
    pub fn connect_lazy(config: &ClientConfig) -> Result<Self> {
        let timeouts = &config.timeouts;
        let peers = |table: &std::collections::BTreeMap<String, EndpointConfig>| {
            table
                .iter()
                .map(|(name, endpoint)| -> Result<(String, PeerHandle)> {
                    Ok((name.clone(), GrpcPeer::connect_lazy(name, endpoint, timeouts)?.handle()))
                })
                .collect::<Result<HashMap<_, _>>>()
        };
        Ok(Self {
            peers: peers(&config.peers)?,
            event_peers: peers(&config.event_peers)?,
            orderers: config
                .orderers
                .iter()
                .map(|(name, endpoint)| -> Result<(String, OrdererHandle)> {
                    Ok((name.clone(), GrpcOrderer::connect_lazy(name, endpoint, timeouts)?.handle()))
                })
                .collect::<Result<_>>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_scheme() {
        let timeouts = TimeoutConfig::default();
        let plain = EndpointConfig {
            url: "peer0:7051".into(),
            ..Default::default()
        };
        let endpoint = endpoint(&plain, &timeouts, None).unwrap();
        assert_eq!(endpoint.uri().scheme_str(), Some("http"));
        assert_eq!(endpoint.uri().port_u16(), Some(7051));

        let explicit = EndpointConfig {
            url: "http://peer1:8051".into(),
            ..Default::default()
        };
        let endpoint = super::endpoint(&explicit, &timeouts, None).unwrap();
        assert_eq!(endpoint.uri().host(), Some("peer1"));
    }

    #[test]
    fn test_tls_without_ca_uses_public_roots() {
        let tls = EndpointConfig {
            url: "orderer.example.com:7050".into(),
            use_tls: true,
            tls_ca_pem: None,
            ..Default::default()
        };
        let endpoint = endpoint(&tls, &TimeoutConfig::default(), None).unwrap();
        assert_eq!(endpoint.uri().scheme_str(), Some("https"));
    }

    #[test]
    fn test_invalid_endpoint() {
        let bad = EndpointConfig {
            url: "not a uri".into(),
            ..Default::default()
        };
        assert!(matches!(
            endpoint(&bad, &TimeoutConfig::default(), None),
            Err(ClientError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_lazy_transports_do_not_dial() {
        let mut config = ClientConfig::default();
        config.peers.insert(
            "peer0".into(),
            EndpointConfig {
                url: "127.0.0.1:1".into(),
                ..Default::default()
            },
        );
        config.orderers.insert(
            "orderer0".into(),
            EndpointConfig {
                url: "127.0.0.1:1".into(),
                ..Default::default()
            },
        );
        let transports = Transports::connect_lazy(&config).unwrap();
        assert_eq!(transports.peers.len(), 1);
        assert_eq!(transports.orderers.len(), 1);
        assert!(transports.event_peers.is_empty());
    }
}
