//! JSON rendering of channel configuration.
//!
//! Groups, values and policies are rendered structurally with sorted keys.
//! Values are decoded by their well-known key (`MSP`, `AnchorPeers`,
//! `BatchSize`, `OrdererAddresses`, `Capabilities` and friends) and policies
//! by their type. Anything unrecognized, or that fails to decode, is emitted
//! as hex.

use hfc_types::common::{
    signature_policy, BlockDataHashingStructure, Capabilities, Config, ConfigGroup, ConfigPolicy,
    ConfigValue, Consortium, HashingAlgorithm, ImplicitMetaPolicy, ImplicitMetaRule,
    OrdererAddresses, Policy, PolicyType, SignaturePolicy, SignaturePolicyEnvelope,
};
use hfc_types::msp::{
    FabricMspConfig, FabricNodeOus, FabricOuIdentifier, MspConfig, MspPrincipal, MspRole,
    MspRoleType, PrincipalClassification, FABRIC_MSP_TYPE,
};
use hfc_types::orderer::{BatchSize, BatchTimeout, ChannelRestrictions, ConsensusState, ConsensusType};
use hfc_types::peer::{Acls, AnchorPeers};
use hfc_types::Message;
use serde_json::{json, Map, Value};

/// Renders a channel configuration as JSON.
pub fn config_to_json(config: &Config) -> Value {
    json!({
        "sequence": config.sequence,
        "channel_group": config.channel_group.as_ref().map(group_to_json),
    })
}

fn group_to_json(group: &ConfigGroup) -> Value {
    let groups: Map<String, Value> = group
        .groups
        .iter()
        .map(|(k, g)| (k.clone(), group_to_json(g)))
        .collect();
    let values: Map<String, Value> = group
        .values
        .iter()
        .map(|(k, v)| (k.clone(), value_to_json(k, v)))
        .collect();
    let policies: Map<String, Value> = group
        .policies
        .iter()
        .map(|(k, p)| (k.clone(), policy_to_json(p)))
        .collect();
    json!({
        "version": group.version,
        "mod_policy": group.mod_policy,
        "groups": groups,
        "values": values,
        "policies": policies,
    })
}

fn value_to_json(key: &str, value: &ConfigValue) -> Value {
    json!({
        "version": value.version,
        "mod_policy": value.mod_policy,
        "value": decode_value(key, &value.value),
    })
}

fn decode<T: Message + Default>(key: &str, bytes: &[u8]) -> Option<T> {
    T::decode(bytes)
        .map_err(|e| tracing::debug!(key, error = %e, "config value kept as hex"))
        .ok()
}

fn decode_value(key: &str, bytes: &[u8]) -> Value {
    let decoded = match key {
        "MSP" => decode::<MspConfig>(key, bytes).map(|msp| msp_to_json(&msp)),
        "AnchorPeers" => decode::<AnchorPeers>(key, bytes).map(|a| {
            let peers: Vec<Value> = a
                .anchor_peers
                .iter()
                .map(|p| json!({ "host": p.host, "port": p.port }))
                .collect();
            json!({ "anchor_peers": peers })
        }),
        "OrdererAddresses" | "Endpoints" => decode::<OrdererAddresses>(key, bytes)
            .map(|a| json!({ "addresses": a.addresses })),
        "Consortium" => decode::<Consortium>(key, bytes).map(|c| json!({ "name": c.name })),
        "HashingAlgorithm" => {
            decode::<HashingAlgorithm>(key, bytes).map(|h| json!({ "name": h.name }))
        }
        "BlockDataHashingStructure" => {
            decode::<BlockDataHashingStructure>(key, bytes).map(|b| json!({ "width": b.width }))
        }
        "Capabilities" => decode::<Capabilities>(key, bytes).map(|c| {
            let names: Map<String, Value> = c
                .capabilities
                .keys()
                .map(|name| (name.clone(), json!({})))
                .collect();
            json!({ "capabilities": names })
        }),
        "ACLs" => decode::<Acls>(key, bytes).map(|a| {
            let acls: Map<String, Value> = a
                .acls
                .iter()
                .map(|(name, r)| (name.clone(), json!({ "policy_ref": r.policy_ref })))
                .collect();
            json!({ "acls": acls })
        }),
        "BatchSize" => decode::<BatchSize>(key, bytes).map(|b| {
            json!({
                "max_message_count": b.max_message_count,
                "absolute_max_bytes": b.absolute_max_bytes,
                "preferred_max_bytes": b.preferred_max_bytes,
            })
        }),
        "BatchTimeout" => {
            decode::<BatchTimeout>(key, bytes).map(|b| json!({ "timeout": b.timeout }))
        }
        "ChannelRestrictions" => decode::<ChannelRestrictions>(key, bytes)
            .map(|r| json!({ "max_count": r.max_count })),
        "ConsensusType" => decode::<ConsensusType>(key, bytes).map(|c| {
            let state = match ConsensusState::try_from(c.state) {
                Ok(ConsensusState::Maintenance) => "STATE_MAINTENANCE",
                _ => "STATE_NORMAL",
            };
            json!({
                "type": c.r#type,
                "metadata": hex::encode(&c.metadata),
                "state": state,
            })
        }),
        _ => None,
    };
    decoded.unwrap_or_else(|| Value::String(hex::encode(bytes)))
}

fn msp_to_json(msp: &MspConfig) -> Value {
    let config = if msp.r#type == FABRIC_MSP_TYPE {
        decode::<FabricMspConfig>("MSP", &msp.config).map(|c| fabric_msp_to_json(&c))
    } else {
        None
    };
    json!({
        "type": msp.r#type,
        "config": config.unwrap_or_else(|| Value::String(hex::encode(&msp.config))),
    })
}

fn fabric_msp_to_json(msp: &FabricMspConfig) -> Value {
    let ou_identifiers: Vec<Value> = msp
        .organizational_unit_identifiers
        .iter()
        .map(ou_to_json)
        .collect();
    json!({
        "name": msp.name,
        "root_certs": pem_list(&msp.root_certs),
        "intermediate_certs": pem_list(&msp.intermediate_certs),
        "admins": pem_list(&msp.admins),
        "revocation_list": pem_list(&msp.revocation_list),
        "organizational_unit_identifiers": ou_identifiers,
        "crypto_config": msp.crypto_config.as_ref().map(|c| json!({
            "signature_hash_family": c.signature_hash_family,
            "identity_identifier_hash_function": c.identity_identifier_hash_function,
        })),
        "tls_root_certs": pem_list(&msp.tls_root_certs),
        "tls_intermediate_certs": pem_list(&msp.tls_intermediate_certs),
        "fabric_node_ous": msp.fabric_node_ous.as_ref().map(node_ous_to_json),
    })
}

fn node_ous_to_json(ous: &FabricNodeOus) -> Value {
    json!({
        "enable": ous.enable,
        "client_ou_identifier": ous.client_ou_identifier.as_ref().map(ou_to_json),
        "peer_ou_identifier": ous.peer_ou_identifier.as_ref().map(ou_to_json),
        "admin_ou_identifier": ous.admin_ou_identifier.as_ref().map(ou_to_json),
        "orderer_ou_identifier": ous.orderer_ou_identifier.as_ref().map(ou_to_json),
    })
}

fn ou_to_json(ou: &FabricOuIdentifier) -> Value {
    json!({
        "certificate": pem(&ou.certificate),
        "organizational_unit_identifier": ou.organizational_unit_identifier,
    })
}

// PEM text stays readable; DER falls back to hex.
fn pem(bytes: &[u8]) -> Value {
    match std::str::from_utf8(bytes) {
        Ok(text) => Value::String(text.to_string()),
        Err(_) => Value::String(hex::encode(bytes)),
    }
}

fn pem_list(certs: &[Vec<u8>]) -> Value {
    Value::Array(certs.iter().map(|c| pem(c.as_slice())).collect())
}

fn policy_to_json(policy: &ConfigPolicy) -> Value {
    json!({
        "version": policy.version,
        "mod_policy": policy.mod_policy,
        "policy": policy.policy.as_ref().map(|p| json!({
            "type": p.r#type,
            "value": policy_value(p),
        })),
    })
}

fn policy_value(policy: &Policy) -> Value {
    let decoded = match PolicyType::try_from(policy.r#type) {
        Ok(PolicyType::Signature) => decode::<SignaturePolicyEnvelope>("policy", &policy.value)
            .map(|envelope| signature_envelope_to_json(&envelope)),
        Ok(PolicyType::ImplicitMeta) => {
            decode::<ImplicitMetaPolicy>("policy", &policy.value).map(|meta| {
                let rule = match ImplicitMetaRule::try_from(meta.rule) {
                    Ok(ImplicitMetaRule::All) => "ALL",
                    Ok(ImplicitMetaRule::Majority) => "MAJORITY",
                    _ => "ANY",
                };
                json!({ "sub_policy": meta.sub_policy, "rule": rule })
            })
        }
        _ => None,
    };
    decoded.unwrap_or_else(|| Value::String(hex::encode(&policy.value)))
}

fn signature_envelope_to_json(envelope: &SignaturePolicyEnvelope) -> Value {
    let identities: Vec<Value> = envelope.identities.iter().map(principal_to_json).collect();
    json!({
        "version": envelope.version,
        "rule": envelope.rule.as_ref().map(rule_to_json),
        "identities": identities,
    })
}

fn rule_to_json(rule: &SignaturePolicy) -> Value {
    match &rule.r#type {
        Some(signature_policy::Type::SignedBy(index)) => json!({ "signed_by": index }),
        Some(signature_policy::Type::NOutOf(n_out_of)) => {
            let rules: Vec<Value> = n_out_of.rules.iter().map(rule_to_json).collect();
            json!({ "n_out_of": { "n": n_out_of.n, "rules": rules } })
        }
        None => Value::Null,
    }
}

fn principal_to_json(principal: &MspPrincipal) -> Value {
    let classification = PrincipalClassification::try_from(principal.principal_classification);
    let name = match classification {
        Ok(PrincipalClassification::Role) => "ROLE",
        Ok(PrincipalClassification::OrganizationUnit) => "ORGANIZATION_UNIT",
        Ok(PrincipalClassification::Identity) => "IDENTITY",
        Ok(PrincipalClassification::Anonymity) => "ANONYMITY",
        Ok(PrincipalClassification::Combined) => "COMBINED",
        Err(_) => "UNKNOWN",
    };
    let role = match classification {
        Ok(PrincipalClassification::Role) => MspRole::decode(principal.principal.as_slice()).ok(),
        _ => None,
    };
    let body = match role {
        Some(role) => json!({
            "msp_identifier": role.msp_identifier,
            "role": role_name(role.role),
        }),
        None => Value::String(hex::encode(&principal.principal)),
    };
    json!({ "principal_classification": name, "principal": body })
}

fn role_name(role: i32) -> &'static str {
    match MspRoleType::try_from(role) {
        Ok(MspRoleType::Member) => "MEMBER",
        Ok(MspRoleType::Admin) => "ADMIN",
        Ok(MspRoleType::Client) => "CLIENT",
        Ok(MspRoleType::Peer) => "PEER",
        Ok(MspRoleType::Orderer) => "ORDERER",
        Err(_) => "UNKNOWN",
    }
}
