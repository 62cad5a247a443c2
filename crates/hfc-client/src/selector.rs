//! Endorsement and ordering target selection.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use rand::seq::SliceRandom;

/// Which peers endorse a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndorsementRule {
    /// Every configured peer.
    All,
    /// One random peer from each listed organization.
    And(Vec<String>),
    /// One random peer from the union of the listed organizations.
    Or(Vec<String>),
}

impl EndorsementRule {
    /// Builds a rule from its configuration form.
    ///
    /// # Errors
    ///
    /// [`ClientError::Config`] for a rule other than `""`, `"and"` or `"or"`.
    pub fn parse(rule: &str, orgs: &[String]) -> Result<Self> {
        match rule {
            "" => Ok(Self::All),
            "and" => Ok(Self::And(orgs.to_vec())),
            "or" => Ok(Self::Or(orgs.to_vec())),
            other => Err(ClientError::Config(format!("unknown endorsement rule {other:?}"))),
        }
    }
}

/// A configured peer and its organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEntry {
    /// Peer name.
    pub name: String,
    /// Organization (MSP) id.
    pub org: String,
}

/// Picks endorsers and an orderer per submission.
///
/// Choices are random per call, never sticky.
#[derive(Debug, Clone)]
pub struct TargetSelector {
    peers: Vec<PeerEntry>,
    orderers: Vec<String>,
    rule: EndorsementRule,
}

impl TargetSelector {
    /// Creates a selector over explicit peer and orderer tables.
    pub fn new(peers: Vec<PeerEntry>, orderers: Vec<String>, rule: EndorsementRule) -> Self {
        Self {
            peers,
            orderers,
            rule,
        }
    }

    /// Creates a selector from the peer, orderer and policy sections.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let policy = &config.channel.chaincode_policy;
        Ok(Self::new(
            config
                .peers
                .iter()
                .map(|(name, endpoint)| PeerEntry {
                    name: name.clone(),
                    org: endpoint.org_name.clone(),
                })
                .collect(),
            config.orderers.keys().cloned().collect(),
            EndorsementRule::parse(&policy.rule, &policy.orgs)?,
        ))
    }

    /// The rule in force.
    pub fn rule(&self) -> &EndorsementRule {
        &self.rule
    }

    /// Peers to endorse against.
    ///
    /// # Errors
    ///
    /// [`ClientError::NoPeersConfigured`] if the rule selects nobody.
    pub fn select_peers(&self) -> Result<Vec<String>> {
        let mut rng = rand::thread_rng();
        let selected: Vec<String> = match &self.rule {
            EndorsementRule::All => self.peers.iter().map(|p| p.name.clone()).collect(),
            EndorsementRule::And(orgs) => {
                let mut selected = Vec::with_capacity(orgs.len());
                for org in orgs {
                    let candidates = self.peers_of(std::slice::from_ref(org));
                    let peer = candidates.choose(&mut rng).ok_or_else(|| {
                        ClientError::Config(format!("no peers configured for organization {org}"))
                    })?;
                    selected.push(peer.name.clone());
                }
                selected
            }
            EndorsementRule::Or(orgs) => self
                .peers_of(orgs)
                .choose(&mut rng)
                .map(|p| vec![p.name.clone()])
                .unwrap_or_default(),
        };
        if selected.is_empty() {
            return Err(ClientError::NoPeersConfigured);
        }
        Ok(selected)
    }

    /// One ordering endpoint, uniformly at random.
    ///
    /// # Errors
    ///
    /// [`ClientError::NoOrderersConfigured`] if there is none.
    pub fn select_orderer(&self) -> Result<String> {
        self.orderers
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(ClientError::NoOrderersConfigured)
    }

    fn peers_of(&self, orgs: &[String]) -> Vec<&PeerEntry> {
        self.peers.iter().filter(|p| orgs.contains(&p.org)).collect()
    }
}
