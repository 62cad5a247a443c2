//! Endorse, assemble and broadcast through the client facade.

mod common;

use common::*;
use hfc_client::config::ChannelConfig;
use hfc_client::{ChaincodeRequest, ClientError, FabricClient};
use hfc_types::common::{ChannelHeader, Payload, SignatureHeader};
use hfc_types::peer::{ChaincodeActionPayload, Proposal, Transaction};
use hfc_types::Message;
use pretty_assertions::assert_eq;
use sha2::{Digest, Sha256};

fn request() -> ChaincodeRequest {
    ChaincodeRequest::new("", "", ["invoke", "a", "b", "10"])
}

#[tokio::test]
async fn test_invoke_embeds_every_endorsement() {
    let orderer = RecordingOrderer::new(200);
    let client = client(
        &[
            peer("peerA", "Org1MSP", MockEndorser::endorsing(b"rwset", &[1])),
            peer("peerB", "Org2MSP", MockEndorser::endorsing(b"rwset", &[2])),
        ],
        orderer.clone(),
        ScriptedDeliverer::silent(),
    );

    let response = client.invoke(&request()).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.payload, b"result".to_vec());
    assert_eq!(response.tx_id.len(), 64);

    let envelopes = orderer.envelopes();
    assert_eq!(envelopes.len(), 1);
    let payload = Payload::decode(envelopes[0].payload.as_slice()).unwrap();
    let header = payload.header.unwrap();
    let channel_header = ChannelHeader::decode(header.channel_header.as_slice()).unwrap();
    assert_eq!(channel_header.channel_id, CHANNEL);
    assert_eq!(channel_header.tx_id, response.tx_id);

    let signature_header = SignatureHeader::decode(header.signature_header.as_slice()).unwrap();
    let mut hasher = Sha256::new();
    hasher.update(&signature_header.nonce);
    hasher.update(&signature_header.creator);
    let expected: String = hasher.finalize().iter().map(|b| format!("{b:02x}")).collect();
    assert_eq!(response.tx_id, expected);

    let transaction = Transaction::decode(payload.data.as_slice()).unwrap();
    let action = ChaincodeActionPayload::decode(transaction.actions[0].payload.as_slice()).unwrap();
    let signatures: Vec<Vec<u8>> = action
        .action
        .unwrap()
        .endorsements
        .into_iter()
        .map(|e| e.signature)
        .collect();
    assert_eq!(signatures, vec![vec![1], vec![2]]);
}

#[tokio::test]
async fn test_unreachable_peer_blocks_broadcast() {
    let orderer = RecordingOrderer::new(200);
    let healthy = MockEndorser::endorsing(b"rwset", &[1]);
    let client = client(
        &[
            peer("peerA", "Org1MSP", healthy.clone()),
            peer("peerB", "Org2MSP", MockEndorser::new(Reply::Unreachable)),
        ],
        orderer.clone(),
        ScriptedDeliverer::silent(),
    );

    let err = client.invoke(&request()).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::EndorsementFailed { ref peer, ref source }
            if peer == "peerB" && matches!(**source, ClientError::Transport(_))
    ));
    assert_eq!(healthy.calls(), 1);
    assert!(orderer.envelopes().is_empty());
}

#[tokio::test]
async fn test_chaincode_error_is_rejected() {
    let orderer = RecordingOrderer::new(200);
    let client = client(
        &[peer("peerA", "Org1MSP", MockEndorser::new(Reply::Status(500)))],
        orderer.clone(),
        ScriptedDeliverer::silent(),
    );

    let err = client.invoke(&request()).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::EndorsementFailed { ref source, .. }
            if matches!(**source, ClientError::ProposalRejected { status: 500, .. })
    ));
    assert!(orderer.envelopes().is_empty());
}

#[tokio::test]
async fn test_divergent_results_are_not_submitted() {
    let orderer = RecordingOrderer::new(200);
    let client = client(
        &[
            peer("peerA", "Org1MSP", MockEndorser::endorsing(b"one", &[1])),
            peer("peerB", "Org2MSP", MockEndorser::endorsing(b"two", &[2])),
        ],
        orderer.clone(),
        ScriptedDeliverer::silent(),
    );

    let err = client.invoke(&request()).await.unwrap_err();
    assert!(matches!(err, ClientError::EndorsementMismatch { ref other, .. } if other == "peerB"));
    assert!(orderer.envelopes().is_empty());
}

#[tokio::test]
async fn test_orderer_rejection() {
    let orderer = RecordingOrderer::new(503);
    let client = client(
        &[peer("peerA", "Org1MSP", MockEndorser::endorsing(b"rwset", &[1]))],
        orderer.clone(),
        ScriptedDeliverer::silent(),
    );

    let err = client.invoke(&request()).await.unwrap_err();
    assert!(matches!(err, ClientError::BroadcastRejected { status: 503, .. }));
    assert_eq!(orderer.envelopes().len(), 1);
}

#[tokio::test]
async fn test_query_asks_one_peer_and_never_broadcasts() {
    let orderer = RecordingOrderer::new(200);
    let first = MockEndorser::new(Reply::Payload(b"90".to_vec()));
    let second = MockEndorser::new(Reply::Payload(b"90".to_vec()));
    let client = client(
        &[
            peer("peerA", "Org1MSP", first.clone()),
            peer("peerB", "Org2MSP", second.clone()),
        ],
        orderer.clone(),
        ScriptedDeliverer::silent(),
    );

    let response = client
        .query(&ChaincodeRequest::new("", "", ["query", "a"]))
        .await
        .unwrap();
    assert_eq!(response.peer, "peerA");
    assert_eq!(response.payload, b"90".to_vec());
    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 0);
    assert!(orderer.envelopes().is_empty());
}

#[tokio::test]
async fn test_explicit_channel_overrides_default() {
    let endorser = MockEndorser::endorsing(b"rwset", &[1]);
    let client = client(
        &[peer("peerA", "Org1MSP", endorser.clone())],
        RecordingOrderer::new(200),
        ScriptedDeliverer::silent(),
    );

    client
        .invoke(&ChaincodeRequest::new("otherchannel", "othercc", ["invoke"]))
        .await
        .unwrap();

    let signed = endorser.last_proposal().unwrap();
    let proposal = Proposal::decode(signed.proposal_bytes.as_slice()).unwrap();
    let header = hfc_types::common::Header::decode(proposal.header.as_slice()).unwrap();
    let channel_header = ChannelHeader::decode(header.channel_header.as_slice()).unwrap();
    assert_eq!(channel_header.channel_id, "otherchannel");
}

#[tokio::test]
async fn test_unknown_orderer_fails_before_endorsement() {
    let endorser = MockEndorser::endorsing(b"rwset", &[1]);
    let (config, mut transports) = client_parts(
        &[peer("peerA", "Org1MSP", endorser.clone())],
        RecordingOrderer::new(200),
        ScriptedDeliverer::silent(),
        ChannelConfig {
            channel_id: CHANNEL.into(),
            chaincode_name: CHAINCODE.into(),
            ..Default::default()
        },
    );
    transports.orderers.clear();
    let client = FabricClient::new(config, signer(), transports).unwrap();

    assert!(matches!(
        client.invoke(&request()).await,
        Err(ClientError::UnknownOrderer(ref name)) if name == "orderer0"
    ));
    assert_eq!(endorser.calls(), 0);
}

#[tokio::test]
async fn test_construction_validates_config() {
    let (mut config, transports) = client_parts(
        &[peer("peerA", "Org1MSP", MockEndorser::endorsing(b"rwset", &[1]))],
        RecordingOrderer::new(200),
        ScriptedDeliverer::silent(),
        ChannelConfig::default(),
    );
    config.orderers.clear();
    assert!(matches!(
        FabricClient::new(config, signer(), transports),
        Err(ClientError::NoOrderersConfigured)
    ));
}

#[tokio::test]
async fn test_missing_defaults_are_invalid() {
    let client = client_with_channel(
        &[peer("peerA", "Org1MSP", MockEndorser::endorsing(b"rwset", &[1]))],
        RecordingOrderer::new(200),
        ScriptedDeliverer::silent(),
        ChannelConfig::default(),
    );

    assert!(matches!(
        client.invoke(&request()).await,
        Err(ClientError::InvalidOperation(_))
    ));
    assert!(matches!(
        client
            .invoke(&ChaincodeRequest::new("mychannel", "", ["invoke"]))
            .await,
        Err(ClientError::InvalidOperation(_))
    ));
}
