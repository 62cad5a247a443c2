//! Transaction assembly and broadcast.

use crate::endorsement::validate_response;
use crate::error::{ClientError, Result};
use crate::proposal::Proposal;
use crate::signer::Signer;
use crate::transport::Broadcaster;
use hfc_types::common::{Envelope, Payload, Status};
use hfc_types::peer::{
    ChaincodeActionPayload, ChaincodeEndorsedAction, ChaincodeProposalPayload, ProposalResponse,
    Transaction, TransactionAction,
};
use hfc_types::Message;
use std::collections::HashMap;
use tracing::{debug, info};

/// Merges endorsements into a signed transaction envelope.
///
/// Every response must be successful, carry an endorsement, and agree
/// byte-for-byte on the simulation result. The transaction reuses the
/// proposal header and omits the transient map.
///
/// # Errors
///
/// [`ClientError::ProposalRejected`] for an unsuccessful or unendorsed
/// response, [`ClientError::EndorsementMismatch`] if results differ, and
/// [`ClientError::InvalidOperation`] without any response.
pub fn assemble(
    proposal: &Proposal,
    responses: &[(String, ProposalResponse)],
    signer: &Signer,
) -> Result<Envelope> {
    let (first_peer, first) = responses
        .first()
        .ok_or_else(|| ClientError::InvalidOperation("no endorsements to assemble".to_string()))?;

    let mut endorsements = Vec::with_capacity(responses.len());
    for (peer, response) in responses {
        validate_response(peer, response)?;
        if response.payload != first.payload {
            return Err(ClientError::EndorsementMismatch {
                first: first_peer.clone(),
                other: peer.clone(),
            });
        }
        let endorsement = response
            .endorsement
            .clone()
            .ok_or_else(|| ClientError::ProposalRejected {
                peer: peer.clone(),
                status: response.response.as_ref().map_or(0, |r| r.status),
                message: "response carries no endorsement".to_string(),
            })?;
        endorsements.push(endorsement);
    }

    let proposal_payload = ChaincodeProposalPayload {
        input: proposal.payload().input.clone(),
        transient_map: HashMap::new(),
    };
    let action_payload = ChaincodeActionPayload {
        chaincode_proposal_payload: proposal_payload.encode_to_vec(),
        action: Some(ChaincodeEndorsedAction {
            proposal_response_payload: first.payload.clone(),
            endorsements,
        }),
    };
    let transaction = Transaction {
        actions: vec![TransactionAction {
            header: proposal.header().signature_header.clone(),
            payload: action_payload.encode_to_vec(),
        }],
    };
    let payload = Payload {
        header: Some(proposal.header().clone()),
        data: transaction.encode_to_vec(),
    };

    debug!(tx_id = %proposal.tx_id(), endorsements = responses.len(), "assembled transaction");
    signer.sign_payload(&payload)
}

/// Sends `envelope` to the ordering service and checks the acknowledgment.
///
/// No retry happens here.
///
/// # Errors
///
/// Transport failures unchanged; [`ClientError::BroadcastRejected`] for a
/// non-success acknowledgment.
pub async fn broadcast(orderer: &dyn Broadcaster, envelope: Envelope) -> Result<()> {
    let ack = orderer.broadcast(envelope).await?;
    if ack.status != Status::Success as i32 {
        return Err(ClientError::BroadcastRejected {
            status: ack.status,
            info: ack.info,
        });
    }
    info!("transaction accepted by orderer");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::{ChaincodeRequest, ProposalBuilder};
    use async_trait::async_trait;
    use hfc_identity::{EcdsaP256Sha256, Identity, PrivateKey};
    use hfc_types::orderer::BroadcastResponse;
    use hfc_types::peer::{Endorsement, Response};
    use std::sync::Arc;

    fn signer() -> Signer {
        Signer::new(
            Identity::new(b"cert".to_vec(), "Org1MSP", PrivateKey::generate()),
            Arc::new(EcdsaP256Sha256),
        )
    }

    fn endorsed(payload: &[u8], signature: u8) -> ProposalResponse {
        ProposalResponse {
            response: Some(Response {
                status: 200,
                message: String::new(),
                payload: b"ok".to_vec(),
            }),
            payload: payload.to_vec(),
            endorsement: Some(Endorsement {
                endorser: vec![signature],
                signature: vec![signature; 4],
            }),
            ..Default::default()
        }
    }

    fn proposal(signer: &Signer) -> Proposal {
        let request = ChaincodeRequest::new("mychannel", "mycc", ["invoke"])
            .with_transient("k", b"private".to_vec());
        ProposalBuilder::new(signer.clone()).invocation(&request).unwrap()
    }

    #[test]
    fn test_assemble_strips_transient_and_reuses_header() {
        let signer = signer();
        let proposal = proposal(&signer);
        let responses = vec![
            ("p1".to_string(), endorsed(b"rw", 1)),
            ("p2".to_string(), endorsed(b"rw", 2)),
        ];
        let envelope = assemble(&proposal, &responses, &signer).unwrap();

        let payload = Payload::decode(envelope.payload.as_slice()).unwrap();
        assert_eq!(payload.header.as_ref(), Some(proposal.header()));
        let tx = Transaction::decode(payload.data.as_slice()).unwrap();
        assert_eq!(tx.actions.len(), 1);
        assert_eq!(tx.actions[0].header, proposal.header().signature_header);

        let action = ChaincodeActionPayload::decode(tx.actions[0].payload.as_slice()).unwrap();
        let embedded =
            ChaincodeProposalPayload::decode(action.chaincode_proposal_payload.as_slice()).unwrap();
        assert!(embedded.transient_map.is_empty());
        assert_eq!(embedded.input, proposal.payload().input);

        let endorsed_action = action.action.unwrap();
        assert_eq!(endorsed_action.proposal_response_payload, b"rw".to_vec());
        let signatures: Vec<_> = endorsed_action
            .endorsements
            .iter()
            .map(|e| e.signature.clone())
            .collect();
        assert_eq!(signatures, vec![vec![1; 4], vec![2; 4]]);
    }

    #[test]
    fn test_assemble_rejects() {
        let signer = signer();
        let proposal = proposal(&signer);

        let mismatch = vec![
            ("p1".to_string(), endorsed(b"a", 1)),
            ("p2".to_string(), endorsed(b"b", 2)),
        ];
        assert!(matches!(
            assemble(&proposal, &mismatch, &signer),
            Err(ClientError::EndorsementMismatch { ref other, .. }) if other == "p2"
        ));

        let mut failed = endorsed(b"a", 1);
        failed.response.as_mut().unwrap().status = 500;
        assert!(matches!(
            assemble(&proposal, &[("p1".to_string(), failed)], &signer),
            Err(ClientError::ProposalRejected { status: 500, .. })
        ));

        let mut unendorsed = endorsed(b"a", 1);
        unendorsed.endorsement = None;
        assert!(matches!(
            assemble(&proposal, &[("p1".to_string(), unendorsed)], &signer),
            Err(ClientError::ProposalRejected { .. })
        ));

        assert!(matches!(
            assemble(&proposal, &[], &signer),
            Err(ClientError::InvalidOperation(_))
        ));
    }

    struct Ack(i32);

    #[async_trait]
    impl Broadcaster for Ack {
        async fn broadcast(&self, _: Envelope) -> Result<BroadcastResponse> {
            Ok(BroadcastResponse {
                status: self.0,
                info: "info".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_broadcast_status() {
        broadcast(&Ack(200), Envelope::default()).await.unwrap();
        assert!(matches!(
            broadcast(&Ack(503), Envelope::default()).await,
            Err(ClientError::BroadcastRejected { status: 503, .. })
        ));
    }
}
