//! Proposal construction.
//!
//! Every builder method produces a [`Proposal`] that is already signed: the
//! signature covers the exact bytes sent to every endorsing peer. No network
//! I/O happens here.

use crate::error::{ClientError, Result};
use crate::policy::{parse_policy, signed_by_msp_member};
use crate::signer::{now, Signer};
use hfc_identity::TransactionId;
use hfc_types::common::{self, ChannelHeader, Header, HeaderType};
use hfc_types::lifecycle::{
    chaincode_source, ApproveChaincodeDefinitionForMyOrgArgs, ChaincodeSource,
    CheckCommitReadinessArgs, CommitChaincodeDefinitionArgs, InstallChaincodeArgs,
};
use hfc_types::peer::{
    application_policy, ApplicationPolicy, ChaincodeDeploymentSpec, ChaincodeHeaderExtension,
    ChaincodeId, ChaincodeInput, ChaincodeInvocationSpec, ChaincodeProposalPayload, ChaincodeSpec,
    ChaincodeType, SignedProposal,
};
use hfc_types::{Message, CSCC, LIFECYCLE, LSCC, QSCC};
use std::collections::HashMap;

/// Describes one chaincode call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChaincodeRequest {
    /// Target channel; empty falls back to the configured default.
    pub channel_id: String,
    /// Chaincode name; empty falls back to the configured default.
    pub name: String,
    /// Chaincode version.
    pub version: String,
    /// Chaincode source path.
    pub path: String,
    /// Chaincode language.
    pub chaincode_type: ChaincodeType,
    /// String arguments, function name first.
    pub args: Vec<String>,
    /// One binary argument appended after `args`.
    pub arg_bytes: Option<Vec<u8>>,
    /// Pre-encoded arguments used verbatim instead of `args`.
    pub raw_args: Option<Vec<Vec<u8>>>,
    /// Private data sent to endorsers but kept out of the transaction.
    pub transient_map: HashMap<String, Vec<u8>>,
    /// Marks the call as the chaincode's init invocation.
    pub is_init: bool,
}

impl ChaincodeRequest {
    /// A request calling `name` on `channel_id` with string arguments.
    pub fn new<I, S>(channel_id: impl Into<String>, name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            channel_id: channel_id.into(),
            name: name.into(),
            chaincode_type: ChaincodeType::Golang,
            args: args.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Adds a transient entry.
    pub fn with_transient(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.transient_map.insert(key.into(), value.into());
        self
    }

    /// Encodes the argument list.
    ///
    /// Non-empty raw arguments win. Otherwise string arguments are converted
    /// to bytes and a non-empty `arg_bytes` is appended.
    pub fn encoded_args(&self) -> Vec<Vec<u8>> {
        if let Some(raw) = self.raw_args.as_ref().filter(|raw| !raw.is_empty()) {
            return raw.clone();
        }
        let mut args: Vec<Vec<u8>> = self.args.iter().map(|a| a.as_bytes().to_vec()).collect();
        if let Some(bytes) = self.arg_bytes.as_ref().filter(|bytes| !bytes.is_empty()) {
            args.push(bytes.clone());
        }
        args
    }

    fn spec(&self, chaincode_id: ChaincodeId) -> ChaincodeSpec {
        ChaincodeSpec {
            r#type: self.chaincode_type as i32,
            chaincode_id: Some(chaincode_id),
            input: Some(ChaincodeInput {
                args: self.encoded_args(),
                decorations: HashMap::new(),
                is_init: self.is_init,
            }),
            timeout: 0,
        }
    }

    // Invocations address the chaincode by name alone.
    fn invocation_id(&self) -> ChaincodeId {
        ChaincodeId {
            name: self.name.clone(),
            ..Default::default()
        }
    }

    fn deployment_id(&self) -> ChaincodeId {
        ChaincodeId {
            name: self.name.clone(),
            version: self.version.clone(),
            ..Default::default()
        }
    }

    fn install_id(&self) -> ChaincodeId {
        ChaincodeId {
            path: self.path.clone(),
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }
}

/// A chaincode definition for the lifecycle operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChaincodeDefinition {
    /// Chaincode name.
    pub name: String,
    /// Chaincode version.
    pub version: String,
    /// Definition sequence number on the channel.
    pub sequence: i64,
    /// Endorsement plugin; empty selects the peer default.
    pub endorsement_plugin: String,
    /// Validation plugin; empty selects the peer default.
    pub validation_plugin: String,
    /// Endorsement policy expression; empty selects the channel default.
    pub policy: String,
    /// Whether the chaincode must be initialized before use.
    pub init_required: bool,
}

impl ChaincodeDefinition {
    fn validation_parameter(&self) -> Result<Vec<u8>> {
        if self.policy.is_empty() {
            return Ok(Vec::new());
        }
        Ok(ApplicationPolicy {
            r#type: Some(application_policy::Type::SignaturePolicy(parse_policy(
                &self.policy,
            )?)),
        }
        .encode_to_vec())
    }
}

/// A signed proposal with the parts transaction assembly needs.
#[derive(Debug, Clone)]
pub struct Proposal {
    tx_id: TransactionId,
    channel_id: String,
    header: Header,
    payload: ChaincodeProposalPayload,
    signed: SignedProposal,
}

impl Proposal {
    /// Transaction id shared by the proposal and the resulting transaction.
    pub fn tx_id(&self) -> &TransactionId {
        &self.tx_id
    }

    /// Channel the proposal targets; empty for channel-less operations.
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Header reused verbatim by the transaction payload.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Proposal payload, including the transient map.
    pub fn payload(&self) -> &ChaincodeProposalPayload {
        &self.payload
    }

    /// What is sent to the endorsing peers.
    pub fn signed(&self) -> &SignedProposal {
        &self.signed
    }
}

/// Builds signed proposals for one identity.
#[derive(Debug, Clone)]
pub struct ProposalBuilder {
    signer: Signer,
}

impl ProposalBuilder {
    /// Creates a builder signing with `signer`.
    pub fn new(signer: Signer) -> Self {
        Self { signer }
    }

    /// Invoke or query `request`.
    pub fn invocation(&self, request: &ChaincodeRequest) -> Result<Proposal> {
        let chaincode_id = request.invocation_id();
        self.build(
            &request.channel_id,
            chaincode_id.clone(),
            request.spec(chaincode_id),
            request.transient_map.clone(),
        )
    }

    /// Deploys or upgrades `request` through the legacy lifecycle.
    ///
    /// Without an explicit policy, any member of the submitter's MSP may
    /// endorse. A non-empty `collection_config` (a serialized private data
    /// collection package) is passed as the seventh argument.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidOperation`] unless `operation` is `deploy` or
    /// `upgrade`; [`ClientError::InvalidPolicy`] if `policy` does not parse.
    pub fn instantiate(
        &self,
        request: &ChaincodeRequest,
        operation: &str,
        policy: Option<&str>,
        collection_config: Option<Vec<u8>>,
    ) -> Result<Proposal> {
        if operation != "deploy" && operation != "upgrade" {
            return Err(ClientError::InvalidOperation(format!(
                "instantiate operation must be deploy or upgrade, got {operation:?}"
            )));
        }
        let policy = match policy {
            Some(expression) if !expression.is_empty() => parse_policy(expression)?,
            _ => signed_by_msp_member(self.signer.msp_id()),
        };
        let deployment = ChaincodeDeploymentSpec {
            chaincode_spec: Some(request.spec(request.deployment_id())),
            code_package: Vec::new(),
        };
        let mut args = vec![
            operation.as_bytes().to_vec(),
            request.channel_id.as_bytes().to_vec(),
            deployment.encode_to_vec(),
            policy.encode_to_vec(),
            b"escc".to_vec(),
            b"vscc".to_vec(),
        ];
        if let Some(collections) = collection_config.filter(|c| !c.is_empty()) {
            args.push(collections);
        }
        self.system_call(&request.channel_id, LSCC, args, request.transient_map.clone())
    }

    /// Installs a pre-packaged chaincode through the legacy lifecycle.
    pub fn install(&self, request: &ChaincodeRequest, code_package: Vec<u8>) -> Result<Proposal> {
        let deployment = ChaincodeDeploymentSpec {
            chaincode_spec: Some(request.spec(request.install_id())),
            code_package,
        };
        self.system_call(
            "",
            LSCC,
            vec![b"install".to_vec(), deployment.encode_to_vec()],
            HashMap::new(),
        )
    }

    /// Asks a peer to join the channel started by `genesis`.
    pub fn join_channel(&self, genesis: &common::Block) -> Result<Proposal> {
        self.system_call(
            "",
            CSCC,
            vec![b"JoinChain".to_vec(), genesis.encode_to_vec()],
            HashMap::new(),
        )
    }

    /// Installs a chaincode package through the channel-agnostic lifecycle.
    pub fn lifecycle_install(&self, package: Vec<u8>) -> Result<Proposal> {
        let args = InstallChaincodeArgs {
            chaincode_install_package: package,
        };
        self.lifecycle("", "InstallChaincode", args.encode_to_vec())
    }

    /// Approves `definition` for the submitter's organization.
    pub fn approve_for_my_org(
        &self,
        channel_id: &str,
        definition: &ChaincodeDefinition,
        package_id: &str,
    ) -> Result<Proposal> {
        let args = ApproveChaincodeDefinitionForMyOrgArgs {
            sequence: definition.sequence,
            name: definition.name.clone(),
            version: definition.version.clone(),
            endorsement_plugin: definition.endorsement_plugin.clone(),
            validation_plugin: definition.validation_plugin.clone(),
            validation_parameter: definition.validation_parameter()?,
            init_required: definition.init_required,
            source: Some(ChaincodeSource {
                r#type: Some(chaincode_source::Type::LocalPackage(chaincode_source::Local {
                    package_id: package_id.to_string(),
                })),
            }),
        };
        self.lifecycle(
            channel_id,
            "ApproveChaincodeDefinitionForMyOrg",
            args.encode_to_vec(),
        )
    }

    /// Commits `definition` to the channel.
    pub fn commit_definition(
        &self,
        channel_id: &str,
        definition: &ChaincodeDefinition,
    ) -> Result<Proposal> {
        let args = CommitChaincodeDefinitionArgs {
            sequence: definition.sequence,
            name: definition.name.clone(),
            version: definition.version.clone(),
            endorsement_plugin: definition.endorsement_plugin.clone(),
            validation_plugin: definition.validation_plugin.clone(),
            validation_parameter: definition.validation_parameter()?,
            init_required: definition.init_required,
        };
        self.lifecycle(channel_id, "CommitChaincodeDefinition", args.encode_to_vec())
    }

    /// Asks which organizations have approved `definition`.
    pub fn check_commit_readiness(
        &self,
        channel_id: &str,
        definition: &ChaincodeDefinition,
    ) -> Result<Proposal> {
        let args = CheckCommitReadinessArgs {
            sequence: definition.sequence,
            name: definition.name.clone(),
            version: definition.version.clone(),
            endorsement_plugin: definition.endorsement_plugin.clone(),
            validation_plugin: definition.validation_plugin.clone(),
            validation_parameter: definition.validation_parameter()?,
            init_required: definition.init_required,
        };
        self.lifecycle(channel_id, "CheckCommitReadiness", args.encode_to_vec())
    }

    /// Calls a ledger query function such as `GetChainInfo`.
    pub fn ledger_query(&self, channel_id: &str, function: &str, args: &[&str]) -> Result<Proposal> {
        let mut encoded = vec![function.as_bytes().to_vec()];
        encoded.extend(args.iter().map(|a| a.as_bytes().to_vec()));
        self.system_call(channel_id, QSCC, encoded, HashMap::new())
    }

    fn lifecycle(&self, channel_id: &str, function: &str, args: Vec<u8>) -> Result<Proposal> {
        self.system_call(
            channel_id,
            LIFECYCLE,
            vec![function.as_bytes().to_vec(), args],
            HashMap::new(),
        )
    }

    fn system_call(
        &self,
        channel_id: &str,
        chaincode: &str,
        args: Vec<Vec<u8>>,
        transient_map: HashMap<String, Vec<u8>>,
    ) -> Result<Proposal> {
        let chaincode_id = ChaincodeId {
            name: chaincode.to_string(),
            ..Default::default()
        };
        let spec = ChaincodeSpec {
            r#type: ChaincodeType::Golang as i32,
            chaincode_id: Some(chaincode_id.clone()),
            input: Some(ChaincodeInput {
                args,
                decorations: HashMap::new(),
                is_init: false,
            }),
            timeout: 0,
        };
        self.build(channel_id, chaincode_id, spec, transient_map)
    }

    fn build(
        &self,
        channel_id: &str,
        chaincode_id: ChaincodeId,
        spec: ChaincodeSpec,
        transient_map: HashMap<String, Vec<u8>>,
    ) -> Result<Proposal> {
        let tx_id = self.signer.new_transaction_id();

        let channel_header = ChannelHeader {
            r#type: HeaderType::EndorserTransaction as i32,
            version: 0,
            timestamp: Some(now()),
            channel_id: channel_id.to_string(),
            tx_id: tx_id.id().to_string(),
            epoch: 0,
            extension: ChaincodeHeaderExtension {
                chaincode_id: Some(chaincode_id),
            }
            .encode_to_vec(),
            tls_cert_hash: Vec::new(),
        };
        let header = Header {
            channel_header: channel_header.encode_to_vec(),
            signature_header: self.signer.signature_header(&tx_id).encode_to_vec(),
        };
        let payload = ChaincodeProposalPayload {
            input: ChaincodeInvocationSpec {
                chaincode_spec: Some(spec),
            }
            .encode_to_vec(),
            transient_map,
        };

        let proposal_bytes = hfc_types::peer::Proposal {
            header: header.encode_to_vec(),
            payload: payload.encode_to_vec(),
            extension: Vec::new(),
        }
        .encode_to_vec();
        let signature = self.signer.sign(&proposal_bytes)?;

        tracing::debug!(tx_id = %tx_id, channel = %channel_id, "built proposal");

        Ok(Proposal {
            tx_id,
            channel_id: channel_id.to_string(),
            header,
            payload,
            signed: SignedProposal {
                proposal_bytes,
                signature,
            },
        })
    }
}
