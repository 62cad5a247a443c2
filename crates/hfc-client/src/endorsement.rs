//! Concurrent endorsement collection.

use crate::error::{ClientError, Result};
use crate::transport::Endorser;
use hfc_types::common::Status;
use hfc_types::peer::{ProposalResponse, SignedProposal};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// A named peer to endorse against.
#[derive(Clone)]
pub struct EndorserTarget {
    /// Peer name from the configuration.
    pub name: String,
    /// Endorsement service of that peer.
    pub endorser: Arc<dyn Endorser>,
}

impl std::fmt::Debug for EndorserTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndorserTarget")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// The outcome of dispatching a proposal to one peer.
#[derive(Debug)]
pub struct PeerResponse {
    /// Peer name.
    pub peer: String,
    /// What the peer answered, or why it did not.
    pub result: Result<ProposalResponse>,
}

/// Checks that a response carries a successful chaincode response.
///
/// # Errors
///
/// [`ClientError::ProposalRejected`] naming `peer` otherwise.
pub fn validate_response(peer: &str, response: &ProposalResponse) -> Result<()> {
    let inner = response
        .response
        .as_ref()
        .ok_or_else(|| ClientError::ProposalRejected {
            peer: peer.to_string(),
            status: 0,
            message: "response carries no chaincode response".to_string(),
        })?;
    if inner.status != Status::Success as i32 {
        return Err(ClientError::ProposalRejected {
            peer: peer.to_string(),
            status: inner.status,
            message: inner.message.clone(),
        });
    }
    Ok(())
}

/// Sends proposals to peers in parallel.
#[derive(Debug, Clone)]
pub struct EndorsementCollector {
    timeout: Duration,
}

impl EndorsementCollector {
    /// Creates a collector bounding each dispatch by `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Dispatches `proposal` to every target concurrently.
    ///
    /// Returns one [`PeerResponse`] per target, in target order. A failing
    /// peer never affects the dispatch to the others, and a peer that does
    /// not answer in time yields a transport error rather than being dropped.
    pub async fn collect(
        &self,
        targets: &[EndorserTarget],
        proposal: &SignedProposal,
    ) -> Vec<PeerResponse> {
        let mut tasks = JoinSet::new();
        for (index, target) in targets.iter().enumerate() {
            let endorser = Arc::clone(&target.endorser);
            let proposal = proposal.clone();
            let timeout = self.timeout;
            let name = target.name.clone();
            tasks.spawn(async move {
                let result = match tokio::time::timeout(timeout, endorser.process_proposal(proposal)).await {
                    Ok(result) => result,
                    Err(_) => Err(ClientError::Transport(format!(
                        "no response within {timeout:?}"
                    ))),
                };
                debug!(peer = %name, ok = result.is_ok(), "endorsement returned");
                (index, result)
            });
        }

        let mut slots: Vec<Option<Result<ProposalResponse>>> = targets.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => warn!(error = %e, "endorsement task aborted"),
            }
        }

        targets
            .iter()
            .zip(slots)
            .map(|(target, slot)| PeerResponse {
                peer: target.name.clone(),
                result: slot.unwrap_or_else(|| {
                    Err(ClientError::Transport("endorsement task aborted".to_string()))
                }),
            })
            .collect()
    }
}

/// Requires every peer to have endorsed successfully.
///
/// # Errors
///
/// [`ClientError::EndorsementFailed`] naming the first peer, in target order,
/// that failed to answer or answered with a non-success status.
pub fn require_all(responses: Vec<PeerResponse>) -> Result<Vec<(String, ProposalResponse)>> {
    if responses.is_empty() {
        return Err(ClientError::NoPeersConfigured);
    }
    responses
        .into_iter()
        .map(|PeerResponse { peer, result }| {
            let checked = result.and_then(|response| {
                validate_response(&peer, &response)?;
                Ok(response)
            });
            match checked {
                Ok(response) => Ok((peer, response)),
                Err(source) => {
                    warn!(peer = %peer, error = %source, "endorsement failed");
                    Err(ClientError::EndorsementFailed {
                        peer,
                        source: Box::new(source),
                    })
                }
            }
        })
        .collect()
}

/// Uses only the first response, as queries do.
///
/// # Errors
///
/// The first peer's transport error, or [`ClientError::ProposalRejected`].
pub fn require_first(responses: Vec<PeerResponse>) -> Result<(String, ProposalResponse)> {
    let PeerResponse { peer, result } = responses
        .into_iter()
        .next()
        .ok_or(ClientError::NoPeersConfigured)?;
    let response = result?;
    validate_response(&peer, &response)?;
    Ok((peer, response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hfc_types::peer::Response;

    struct Fixed(i32);

    #[async_trait]
    impl Endorser for Fixed {
        async fn process_proposal(&self, _: SignedProposal) -> Result<ProposalResponse> {
            Ok(response(self.0))
        }
    }

    struct Hang;

    #[async_trait]
    impl Endorser for Hang {
        async fn process_proposal(&self, _: SignedProposal) -> Result<ProposalResponse> {
            futures::future::pending().await
        }
    }

    fn response(status: i32) -> ProposalResponse {
        ProposalResponse {
            response: Some(Response {
                status,
                message: format!("status {status}"),
                payload: vec![],
            }),
            ..Default::default()
        }
    }

    fn target(name: &str, endorser: impl Endorser + 'static) -> EndorserTarget {
        EndorserTarget {
            name: name.to_string(),
            endorser: Arc::new(endorser),
        }
    }

    #[test]
    fn test_validate_response() {
        assert!(validate_response("p", &response(200)).is_ok());
        assert!(matches!(
            validate_response("p", &response(500)),
            Err(ClientError::ProposalRejected { status: 500, .. })
        ));
        assert!(matches!(
            validate_response("p", &ProposalResponse::default()),
            Err(ClientError::ProposalRejected { status: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_collect_keeps_target_order() {
        let targets = vec![target("a", Fixed(200)), target("b", Fixed(500)), target("c", Fixed(200))];
        let responses = EndorsementCollector::new(Duration::from_secs(1))
            .collect(&targets, &SignedProposal::default())
            .await;
        let names: Vec<_> = responses.iter().map(|r| r.peer.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        let err = require_all(responses).unwrap_err();
        assert_eq!(err.peer(), Some("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_peer_times_out() {
        let targets = vec![target("fast", Fixed(200)), target("slow", Hang)];
        let responses = EndorsementCollector::new(Duration::from_secs(3))
            .collect(&targets, &SignedProposal::default())
            .await;
        assert!(responses[0].result.is_ok());
        assert!(matches!(responses[1].result, Err(ClientError::Transport(_))));
    }

    #[tokio::test]
    async fn test_require_first_ignores_later_peers() {
        let targets = vec![target("a", Fixed(200)), target("b", Fixed(500))];
        let responses = EndorsementCollector::new(Duration::from_secs(1))
            .collect(&targets, &SignedProposal::default())
            .await;
        let (peer, _) = require_first(responses).unwrap();
        assert_eq!(peer, "a");
    }

    #[test]
    fn test_require_all_empty() {
        assert!(matches!(require_all(vec![]), Err(ClientError::NoPeersConfigured)));
    }
}
