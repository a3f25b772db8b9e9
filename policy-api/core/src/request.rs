//! The simplified, caller-facing policy model.
//!
//! A [`PolicyRequest`] is accepted when creating a policy and is also what the
//! read endpoints reconstruct from stored `CiliumNetworkPolicy` resources.

use crate::Map;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct NamespaceRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceAccountRequest {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRequest {
    /// When absent (or empty) a name is generated from `labels`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub namespace: String,

    /// Becomes the policy's endpoint selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Map>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_rules: Option<Vec<NetworkRule>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_deny_rules: Option<Vec<NetworkRule>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub egress_rules: Option<Vec<NetworkRule>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub egress_deny_rules: Option<Vec<NetworkRule>>,
}

/// Matches peers either by CIDR or by a single label set, never both.
///
/// Each rule carries at most one label set and one group of ports.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRule {
    pub rule_type: RuleType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_addresses: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_labels: Option<Map>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_labels: Option<Map>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<PortRule>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRule {
    pub protocol: Protocol,

    pub port: u16,

    /// Makes this rule cover the inclusive range `port..=end_port`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_matches: Option<Vec<HeaderMatch>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct HeaderMatch {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleType {
    IngressAllow,
    IngressDeny,
    EgressAllow,
    EgressDeny,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Ingress,
    Egress,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Protocol {
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "UDP")]
    Udp,
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported protocol: {0}")]
pub struct UnsupportedProtocol(String);

// === impl PolicyRequest ===

impl PolicyRequest {
    /// Returns the caller-supplied name, if it is non-empty.
    pub fn explicit_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    /// Iterates over every rule list along with the rule type it is stored as.
    pub fn rule_lists(&self) -> impl Iterator<Item = (RuleType, &[NetworkRule])> {
        [
            (RuleType::IngressAllow, &self.ingress_rules),
            (RuleType::IngressDeny, &self.ingress_deny_rules),
            (RuleType::EgressAllow, &self.egress_rules),
            (RuleType::EgressDeny, &self.egress_deny_rules),
        ]
        .into_iter()
        .map(|(rt, rules)| (rt, rules.as_deref().unwrap_or_default()))
    }
}

// === impl NetworkRule ===

impl NetworkRule {
    pub fn has_ip_addresses(&self) -> bool {
        self.ip_addresses.as_ref().is_some_and(|ips| !ips.is_empty())
    }

    /// The label set that applies in the given direction.
    pub fn labels_for(&self, direction: Direction) -> Option<&Map> {
        match direction {
            Direction::Ingress => self.from_labels.as_ref(),
            Direction::Egress => self.to_labels.as_ref(),
        }
        .filter(|labels| !labels.is_empty())
    }

    pub(crate) fn has_labels(&self) -> bool {
        self.labels_for(Direction::Ingress).is_some() || self.labels_for(Direction::Egress).is_some()
    }
}

// === impl RuleType ===

impl RuleType {
    pub fn direction(self) -> Direction {
        match self {
            Self::IngressAllow | Self::IngressDeny => Direction::Ingress,
            Self::EgressAllow | Self::EgressDeny => Direction::Egress,
        }
    }

    /// The request field that holds rules of this type.
    pub fn field(self) -> &'static str {
        match self {
            Self::IngressAllow => "ingressRules",
            Self::IngressDeny => "ingressDenyRules",
            Self::EgressAllow => "egressRules",
            Self::EgressDeny => "egressDenyRules",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IngressAllow => "INGRESS_ALLOW",
            Self::IngressDeny => "INGRESS_DENY",
            Self::EgressAllow => "EGRESS_ALLOW",
            Self::EgressDeny => "EGRESS_DENY",
        }
    }
}

impl std::fmt::Display for RuleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// === impl Protocol ===

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Protocol {
    type Err = UnsupportedProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TCP" => Ok(Self::Tcp),
            "UDP" => Ok(Self::Udp),
            _ => Err(UnsupportedProtocol(s.to_string())),
        }
    }
}
