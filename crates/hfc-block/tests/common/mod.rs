//! Builders for raw blocks used across decoder tests.

#![allow(dead_code)]

use hfc_types::common::{
    self, BlockData, BlockHeader, BlockMetadata, ChannelHeader, ConfigEnvelope, ConfigGroup,
    ConfigPolicy, ConfigValue, Envelope, Header, HeaderType, LastConfig, Metadata, Payload, Policy,
    PolicyType, SignatureHeader, SignaturePolicy, SignaturePolicyEnvelope,
};
use hfc_types::msp::{
    FabricMspConfig, MspConfig, MspPrincipal, MspRole, MspRoleType, PrincipalClassification,
    SerializedIdentity, FABRIC_MSP_TYPE,
};
use hfc_types::peer::{AnchorPeer, AnchorPeers};
use std::collections::HashMap;
use hfc_types::peer::{
    ChaincodeAction, ChaincodeActionPayload, ChaincodeEndorsedAction, ChaincodeEvent,
    ChaincodeHeaderExtension, ChaincodeId, ChaincodeInput, ChaincodeInvocationSpec,
    ChaincodeProposalPayload, ChaincodeSpec, Endorsement, ProposalResponsePayload, Response,
    Transaction, TransactionAction,
};
use hfc_types::rwset::{KvRwSet, KvWrite, NsReadWriteSet, TxReadWriteSet};
use hfc_types::{Message, Timestamp};

pub const CHANNEL: &str = "mychannel";

pub fn creator(msp: &str) -> Vec<u8> {
    SerializedIdentity {
        mspid: msp.to_string(),
        id_bytes: format!("-----BEGIN CERTIFICATE-----\n{msp}\n-----END CERTIFICATE-----\n")
            .into_bytes(),
    }
    .encode_to_vec()
}

fn signature_header(msp: &str) -> Vec<u8> {
    SignatureHeader {
        creator: creator(msp),
        nonce: vec![1, 2, 3],
    }
    .encode_to_vec()
}

fn channel_header(header_type: HeaderType, tx_id: &str, seconds: i64) -> Vec<u8> {
    ChannelHeader {
        r#type: header_type as i32,
        version: 0,
        timestamp: Some(Timestamp { seconds, nanos: 0 }),
        channel_id: CHANNEL.to_string(),
        tx_id: tx_id.to_string(),
        epoch: 0,
        extension: ChaincodeHeaderExtension {
            chaincode_id: Some(ChaincodeId {
                name: "mycc".into(),
                ..Default::default()
            }),
        }
        .encode_to_vec(),
        tls_cert_hash: vec![],
    }
    .encode_to_vec()
}

fn envelope(channel_header: Vec<u8>, data: Vec<u8>) -> Vec<u8> {
    let payload = Payload {
        header: Some(Header {
            channel_header,
            signature_header: signature_header("Org1MSP"),
        }),
        data,
    }
    .encode_to_vec();
    Envelope {
        payload,
        signature: vec![9, 9],
    }
    .encode_to_vec()
}

/// A serialized endorser transaction writing `key` in namespace `mycc`.
pub fn endorser_entry(tx_id: &str, seconds: i64, key: &str) -> Vec<u8> {
    let invocation = ChaincodeInvocationSpec {
        chaincode_spec: Some(ChaincodeSpec {
            r#type: 1,
            chaincode_id: Some(ChaincodeId {
                name: "mycc".into(),
                ..Default::default()
            }),
            input: Some(ChaincodeInput {
                args: vec![b"invoke".to_vec(), b"a".to_vec(), b"b".to_vec()],
                ..Default::default()
            }),
            timeout: 0,
        }),
    }
    .encode_to_vec();
    let proposal_payload = ChaincodeProposalPayload {
        input: invocation,
        transient_map: Default::default(),
    }
    .encode_to_vec();

    let results = TxReadWriteSet {
        data_model: 0,
        ns_rwset: vec![NsReadWriteSet {
            namespace: "mycc".into(),
            rwset: KvRwSet {
                writes: vec![KvWrite {
                    key: key.to_string(),
                    is_delete: false,
                    value: b"10".to_vec(),
                }],
                ..Default::default()
            }
            .encode_to_vec(),
            collection_hashed_rwset: vec![],
        }],
    }
    .encode_to_vec();
    let action = ChaincodeAction {
        results,
        events: ChaincodeEvent {
            chaincode_id: "mycc".into(),
            tx_id: tx_id.to_string(),
            event_name: "transfer".into(),
            payload: vec![],
        }
        .encode_to_vec(),
        response: Some(Response {
            status: 200,
            message: "OK".into(),
            payload: b"done".to_vec(),
        }),
        chaincode_id: None,
    }
    .encode_to_vec();
    let response_payload = ProposalResponsePayload {
        proposal_hash: vec![7; 32],
        extension: action,
    }
    .encode_to_vec();
    let action_payload = ChaincodeActionPayload {
        chaincode_proposal_payload: proposal_payload,
        action: Some(ChaincodeEndorsedAction {
            proposal_response_payload: response_payload,
            endorsements: vec![
                Endorsement {
                    endorser: creator("Org1MSP"),
                    signature: vec![5],
                },
                Endorsement {
                    endorser: creator("Org2MSP"),
                    signature: vec![6],
                },
            ],
        }),
    }
    .encode_to_vec();
    let tx = Transaction {
        actions: vec![TransactionAction {
            header: signature_header("Org1MSP"),
            payload: action_payload,
        }],
    }
    .encode_to_vec();

    envelope(channel_header(HeaderType::EndorserTransaction, tx_id, seconds), tx)
}

/// The raw last-update payload embedded by [`config_entry`].
pub fn config_update_payload() -> Vec<u8> {
    Payload {
        header: Some(Header {
            channel_header: channel_header(HeaderType::ConfigUpdate, "", 0),
            signature_header: vec![],
        }),
        data: b"update".to_vec(),
    }
    .encode_to_vec()
}

/// An application organization with its MSP, one anchor peer and an
/// `Admins` policy requiring an Org1MSP admin.
pub fn org1_group() -> ConfigGroup {
    let msp = MspConfig {
        r#type: FABRIC_MSP_TYPE,
        config: FabricMspConfig {
            name: "Org1MSP".into(),
            root_certs: vec![b"-----BEGIN CERTIFICATE-----\nroot\n-----END CERTIFICATE-----\n".to_vec()],
            ..Default::default()
        }
        .encode_to_vec(),
    };
    let anchors = AnchorPeers {
        anchor_peers: vec![AnchorPeer {
            host: "peer0.org1.example.com".into(),
            port: 7051,
        }],
    };
    let admins = SignaturePolicyEnvelope {
        version: 0,
        rule: Some(SignaturePolicy::n_out_of(1, vec![SignaturePolicy::signed_by(0)])),
        identities: vec![MspPrincipal {
            principal_classification: PrincipalClassification::Role as i32,
            principal: MspRole {
                msp_identifier: "Org1MSP".into(),
                role: MspRoleType::Admin as i32,
            }
            .encode_to_vec(),
        }],
    };
    ConfigGroup {
        mod_policy: "Admins".into(),
        values: HashMap::from([
            (
                "MSP".to_string(),
                ConfigValue {
                    version: 0,
                    value: msp.encode_to_vec(),
                    mod_policy: "Admins".into(),
                },
            ),
            (
                "AnchorPeers".to_string(),
                ConfigValue {
                    version: 0,
                    value: anchors.encode_to_vec(),
                    mod_policy: "Admins".into(),
                },
            ),
        ]),
        policies: HashMap::from([(
            "Admins".to_string(),
            ConfigPolicy {
                version: 0,
                policy: Some(Policy {
                    r#type: PolicyType::Signature as i32,
                    value: admins.encode_to_vec(),
                }),
                mod_policy: "Admins".into(),
            },
        )]),
        ..Default::default()
    }
}

/// A serialized configuration transaction.
pub fn config_entry() -> Vec<u8> {
    let application = ConfigGroup {
        groups: HashMap::from([("Org1MSP".to_string(), org1_group())]),
        mod_policy: "Admins".into(),
        ..Default::default()
    };
    let config = ConfigEnvelope {
        config: Some(common::Config {
            sequence: 4,
            channel_group: Some(ConfigGroup {
                groups: HashMap::from([("Application".to_string(), application)]),
                mod_policy: "Admins".into(),
                ..Default::default()
            }),
        }),
        last_update: Some(Envelope {
            payload: config_update_payload(),
            signature: vec![],
        }),
    }
    .encode_to_vec();
    envelope(channel_header(HeaderType::Config, "", 100), config)
}

/// A serialized entry of an arbitrary header type with an opaque body.
pub fn entry_of_type(header_type: HeaderType) -> Vec<u8> {
    envelope(channel_header(header_type, "other", 0), vec![1, 2, 3])
}

/// Assembles a raw block with LAST_CONFIG and TRANSACTIONS_FILTER slots.
pub fn block(number: u64, entries: Vec<Vec<u8>>, last_config: u64, filter: Vec<u8>) -> common::Block {
    let empty = Metadata::default().encode_to_vec();
    let last_config = Metadata {
        value: LastConfig { index: last_config }.encode_to_vec(),
        signatures: vec![],
    }
    .encode_to_vec();
    common::Block {
        header: Some(BlockHeader {
            number,
            previous_hash: vec![0xaa; 32],
            data_hash: vec![0xbb; 32],
        }),
        data: Some(BlockData { data: entries }),
        metadata: Some(BlockMetadata {
            metadata: vec![empty.clone(), last_config, filter, empty],
        }),
    }
}
