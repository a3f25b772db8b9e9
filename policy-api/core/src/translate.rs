//! Translation between [`PolicyRequest`]s and `CiliumNetworkPolicy` specs.
//!
//! Label-based peers are always scoped to the policy's own namespace by adding
//! the [`POD_NAMESPACE_LABEL`] to their selector; that label is removed again
//! when a spec is translated back into a request.
//!
//! The request model carries a single label set and a single port group per
//! rule, so only the first `fromEndpoints`/`toEndpoints` and `toPorts`
//! entries of a stored rule are read back. All header matches found on a
//! stored rule are attached to its first port.

use crate::{
    request::{Direction, HeaderMatch, NetworkRule, PolicyRequest, PortRule, Protocol, RuleType},
    Map, POD_NAMESPACE_LABEL,
};
use cilium_policy_api_k8s_api::{
    policy::{self as k8s, CiliumNetworkPolicySpec},
    DynamicObject, ResourceExt, Selector,
};
use tracing::warn;


/// The direction-independent parts of an ingress or egress rule.
#[derive(Debug, Default)]
struct Peer {
    cidr: Option<Vec<String>>,
    endpoints: Option<Vec<Selector>>,
    to_ports: Option<Vec<k8s::PortRule>>,
}

/// Builds the native spec for a (validated) request.
pub fn to_spec(req: &PolicyRequest) -> CiliumNetworkPolicySpec {
    let ns = req.namespace.as_str();
    CiliumNetworkPolicySpec {
        endpoint_selector: Some(Selector::from_map(req.labels.clone().unwrap_or_default())),
        ingress: to_ingress(req.ingress_rules.as_deref(), ns),
        ingress_deny: to_ingress(req.ingress_deny_rules.as_deref(), ns),
        egress: to_egress(req.egress_rules.as_deref(), ns),
        egress_deny: to_egress(req.egress_deny_rules.as_deref(), ns),
    }
}

fn to_ingress(rules: Option<&[NetworkRule]>, ns: &str) -> Option<Vec<k8s::IngressRule>> {
    let rules = rules.filter(|r| !r.is_empty())?;
    let rules = rules
        .iter()
        .map(|rule| {
            let Peer {
                cidr,
                endpoints,
                to_ports,
            } = to_peer(rule, Direction::Ingress, ns);
            k8s::IngressRule {
                from_cidr: cidr,
                from_endpoints: endpoints,
                to_ports,
            }
        })
        .collect();
    Some(rules)
}

fn to_egress(rules: Option<&[NetworkRule]>, ns: &str) -> Option<Vec<k8s::EgressRule>> {
    let rules = rules.filter(|r| !r.is_empty())?;
    let rules = rules
        .iter()
        .map(|rule| {
            let Peer {
                cidr,
                endpoints,
                to_ports,
            } = to_peer(rule, Direction::Egress, ns);
            k8s::EgressRule {
                to_cidr: cidr,
                to_endpoints: endpoints,
                to_ports,
            }
        })
        .collect();
    Some(rules)
}

fn to_peer(rule: &NetworkRule, direction: Direction, ns: &str) -> Peer {
    let mut peer = Peer::default();

    if rule.has_ip_addresses() {
        peer.cidr = rule.ip_addresses.clone();
    } else {
        let mut labels = rule.labels_for(direction).cloned().unwrap_or_default();
        labels.insert(POD_NAMESPACE_LABEL.to_string(), ns.to_string());
        peer.endpoints = Some(vec![Selector::from_map(labels)]);
    }

    if let Some(ports) = rule.ports.as_deref().filter(|p| !p.is_empty()) {
        peer.to_ports = Some(vec![to_port_rule(ports)]);
    }

    peer
}

fn to_port_rule(ports: &[PortRule]) -> k8s::PortRule {
    let protocols = ports
        .iter()
        .map(|p| k8s::PortProtocol {
            port: p.port.to_string(),
            protocol: Some(p.protocol.to_string()),
            end_port: p.end_port.map(i32::from),
        })
        .collect();

    // Each header match becomes its own HTTP rule.
    let http = ports
        .iter()
        .flat_map(|p| p.header_matches.iter().flatten())
        .map(|HeaderMatch { name, value }| k8s::HttpRule {
            header_matches: Some(vec![k8s::HeaderMatch {
                name: name.clone(),
                value: Some(value.clone()),
            }]),
        })
        .collect::<Vec<_>>();

    k8s::PortRule {
        ports: Some(protocols),
        rules: if http.is_empty() {
            None
        } else {
            Some(k8s::L7Rules { http: Some(http) })
        },
    }
}

/// Reconstructs a request from a stored policy object.
///
/// A policy without a spec yields a request carrying only its name and
/// namespace.
pub fn from_object(obj: &DynamicObject) -> Result<PolicyRequest, serde_json::Error> {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();
    let spec = k8s::spec_of(obj)?;
    if spec.is_none() {
        warn!(%namespace, %name, "CiliumNetworkPolicy has no spec");
    }
    Ok(from_spec(name, namespace, spec.as_ref()))
}

pub fn from_spec(
    name: impl Into<String>,
    namespace: impl Into<String>,
    spec: Option<&CiliumNetworkPolicySpec>,
) -> PolicyRequest {
    let mut req = PolicyRequest {
        name: Some(name.into()),
        namespace: namespace.into(),
        ..Default::default()
    };
    let spec = match spec {
        Some(spec) => spec,
        None => return req,
    };

    req.labels = spec
        .endpoint_selector
        .as_ref()
        .and_then(Selector::match_labels)
        .cloned();

    req.ingress_rules = from_ingress(RuleType::IngressAllow, spec.ingress.as_deref());
    req.ingress_deny_rules = from_ingress(RuleType::IngressDeny, spec.ingress_deny.as_deref());
    req.egress_rules = from_egress(RuleType::EgressAllow, spec.egress.as_deref());
    req.egress_deny_rules = from_egress(RuleType::EgressDeny, spec.egress_deny.as_deref());

    req
}

fn from_ingress(
    rule_type: RuleType,
    rules: Option<&[k8s::IngressRule]>,
) -> Option<Vec<NetworkRule>> {
    let rules = rules?
        .iter()
        .map(|r| {
            from_peer(
                rule_type,
                r.from_cidr.as_deref(),
                r.from_endpoints.as_deref(),
                r.to_ports.as_deref(),
            )
        })
        .collect();
    Some(rules)
}

fn from_egress(
    rule_type: RuleType,
    rules: Option<&[k8s::EgressRule]>,
) -> Option<Vec<NetworkRule>> {
    let rules = rules?
        .iter()
        .map(|r| {
            from_peer(
                rule_type,
                r.to_cidr.as_deref(),
                r.to_endpoints.as_deref(),
                r.to_ports.as_deref(),
            )
        })
        .collect();
    Some(rules)
}

fn from_peer(
    rule_type: RuleType,
    cidr: Option<&[String]>,
    endpoints: Option<&[Selector]>,
    to_ports: Option<&[k8s::PortRule]>,
) -> NetworkRule {
    let ip_addresses = cidr.filter(|c| !c.is_empty()).map(<[String]>::to_vec);

    let labels = endpoints
        .and_then(<[Selector]>::first)
        .and_then(Selector::match_labels)
        .map(strip_namespace)
        .filter(|l| !l.is_empty());
    let (from_labels, to_labels) = match rule_type.direction() {
        Direction::Ingress => (labels, None),
        Direction::Egress => (None, labels),
    };

    NetworkRule {
        rule_type,
        ip_addresses,
        from_labels,
        to_labels,
        ports: to_ports.and_then(<[k8s::PortRule]>::first).and_then(from_port_rule),
    }
}

fn strip_namespace(labels: &Map) -> Map {
    labels
        .iter()
        .filter(|(k, _)| k.as_str() != POD_NAMESPACE_LABEL)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn from_port_rule(rule: &k8s::PortRule) -> Option<Vec<PortRule>> {
    let mut ports = rule
        .ports
        .iter()
        .flatten()
        .filter_map(from_port_protocol)
        .collect::<Vec<_>>();

    let headers = rule
        .rules
        .iter()
        .flat_map(|r| r.http.iter().flatten())
        .flat_map(|h| h.header_matches.iter().flatten())
        .filter_map(|h| {
            let value = h.value.clone()?;
            Some(HeaderMatch {
                name: h.name.clone(),
                value,
            })
        })
        .collect::<Vec<_>>();
    if !headers.is_empty() {
        match ports.first_mut() {
            Some(first) => first.header_matches = Some(headers),
            None => warn!(headers = headers.len(), "Dropping header matches without a port"),
        }
    }

    if ports.is_empty() {
        return None;
    }
    Some(ports)
}

fn from_port_protocol(pp: &k8s::PortProtocol) -> Option<PortRule> {
    let protocol = match pp.protocol.as_deref().map(str::parse::<Protocol>) {
        Some(Ok(protocol)) => protocol,
        Some(Err(error)) => {
            warn!(%error, port = %pp.port, "Skipping port");
            return None;
        }
        None => {
            warn!(port = %pp.port, "Skipping port without a protocol");
            return None;
        }
    };

    let port = match pp.port.parse::<u16>() {
        Ok(port) => port,
        Err(error) => {
            warn!(%error, port = %pp.port, "Skipping non-numeric port");
            return None;
        }
    };

    let end_port = pp.end_port.and_then(|end| match u16::try_from(end) {
        Ok(end) => Some(end),
        Err(error) => {
            warn!(%error, end_port = end, "Ignoring out-of-range end port");
            None
        }
    });

    Some(PortRule {
        protocol,
        port,
        end_port,
        header_matches: None,
    })
}
