//! Client configuration.
//!
//! The configuration is parsed once and then passed, read-only, into the
//! components that need it. Nothing here is process-global, so several
//! clients with different networks can live in one process.

use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Configuration for a [`FabricClient`](crate::FabricClient).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Crypto suite selection.
    pub crypto: CryptoConfig,
    /// Endorsing peers by name.
    pub peers: BTreeMap<String, EndpointConfig>,
    /// Peers used for block events and event-peer queries.
    pub event_peers: BTreeMap<String, EndpointConfig>,
    /// Ordering service endpoints by name.
    pub orderers: BTreeMap<String, EndpointConfig>,
    /// Default channel and chaincode.
    pub channel: ChannelConfig,
    /// Network timeouts.
    pub timeouts: TimeoutConfig,
    /// Log output.
    pub log: LogConfig,
}

/// Crypto suite selection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Algorithm family.
    pub family: String,
    /// Curve and digest.
    pub algorithm: String,
    /// Hash used for transaction ids.
    pub hash: String,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            family: "ecdsa".to_string(),
            algorithm: "P256-SHA256".to_string(),
            hash: "SHA2-256".to_string(),
        }
    }
}

/// A peer or orderer endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// `host:port`, optionally with a scheme.
    pub url: String,
    /// Organization (MSP) the node belongs to.
    pub org_name: String,
    /// Connect over TLS.
    pub use_tls: bool,
    /// PEM-encoded CA certificate used to verify the server.
    pub tls_ca_pem: Option<String>,
    /// Server name to verify instead of the host in `url`.
    pub domain_name: Option<String>,
}

/// Default channel and chaincode used when a request leaves them empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Channel id.
    pub channel_id: String,
    /// Chaincode name.
    pub chaincode_name: String,
    /// Chaincode version.
    pub chaincode_version: String,
    /// Endorsement target rule.
    pub chaincode_policy: PolicyConfig,
}

/// Which peers endorse a submission.
///
/// `rule` is empty (all peers), `"and"` (one peer from each of `orgs`) or
/// `"or"` (one peer from any of `orgs`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Organizations named by the rule.
    pub orgs: Vec<String>,
    /// `""`, `"and"` or `"or"`.
    pub rule: String,
}

/// Network timeouts, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment.
    pub connect_secs: u64,
    /// A single proposal or broadcast exchange.
    pub request_secs: u64,
    /// Waiting for a Deliver response.
    pub deliver_secs: u64,
    /// HTTP/2 keepalive ping interval.
    pub keepalive_interval_secs: u64,
    /// HTTP/2 keepalive ping timeout.
    pub keepalive_timeout_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
            deliver_secs: 5,
            keepalive_interval_secs: 60,
            keepalive_timeout_secs: 20,
        }
    }
}

impl TimeoutConfig {
    /// Connection establishment timeout.
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    /// Proposal and broadcast timeout.
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    /// Deliver response timeout.
    pub fn deliver(&self) -> Duration {
        Duration::from_secs(self.deliver_secs)
    }

    /// Keepalive ping interval.
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }

    /// Keepalive ping timeout.
    pub fn keepalive_timeout(&self) -> Duration {
        Duration::from_secs(self.keepalive_timeout_secs)
    }
}

/// Log output settings consumed by [`init_logging`](crate::logging::init_logging).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// trace, debug, info, warn or error.
    pub level: String,
    /// `pretty` or `json`.
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl ClientConfig {
    /// Parses YAML, substituting `${VAR}` with environment variables first.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the YAML does not match the schema.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let expanded = substitute_env(yaml);
        serde_yaml::from_str(&expanded).map_err(|e| ClientError::Config(e.to_string()))
    }

    /// Checks the endorsement rule and that peers and orderers exist.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NoOrderersConfigured`], [`ClientError::NoPeersConfigured`]
    /// or [`ClientError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let policy = &self.channel.chaincode_policy;
        match policy.rule.as_str() {
            "" => {}
            "and" | "or" => {
                if policy.orgs.is_empty() {
                    return Err(ClientError::Config(format!(
                        "rule {:?} requires at least one organization",
                        policy.rule
                    )));
                }
            }
            other => {
                return Err(ClientError::Config(format!(
                    "unknown endorsement rule {other:?}, expected \"\", \"and\" or \"or\""
                )))
            }
        }
        if self.orderers.is_empty() {
            return Err(ClientError::NoOrderersConfigured);
        }
        if self.peers.is_empty() {
            return Err(ClientError::NoPeersConfigured);
        }
        for (name, endpoint) in self.peers.iter().chain(&self.event_peers).chain(&self.orderers) {
            if endpoint.url.is_empty() {
                return Err(ClientError::Config(format!("endpoint {name} has no url")));
            }
        }
        Ok(())
    }
}

/// Replaces `${NAME}` with the value of environment variable `NAME`.
///
/// Unset variables and unterminated references are left untouched.
pub fn substitute_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match std::env::var(name) {
                    Ok(value) => out.push_str(&value),
                    Err(_) => out.push_str(&rest[start..start + 2 + end + 1]),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
