//! Request validation run before anything reaches the cluster.
//!
//! Violations are collected rather than short-circuited so that a caller sees
//! every problem with a request at once.

use crate::{
    request::{
        Direction, HeaderMatch, NamespaceRequest, NetworkRule, PolicyRequest, PortRule, Protocol,
        RuleType, ServiceAccountRequest,
    },
    Map,
};
use once_cell::sync::Lazy;
use regex::Regex;

const DNS_1123_LABEL_REGEX: &str = r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$";
const DNS_1123_LABEL_MAX_LEN: usize = 63;

static DNS_1123_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(DNS_1123_LABEL_REGEX).expect("DNS-1123 label regex must compile"));

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

/// One or more constraint violations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError(Vec<Violation>);

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

#[derive(Default)]
struct Violations(Vec<Violation>);

pub fn is_dns_1123_label(s: &str) -> bool {
    s.len() <= DNS_1123_LABEL_MAX_LEN && DNS_1123_LABEL.is_match(s)
}

// === impl ValidationError ===

impl ValidationError {
    pub fn new(field: impl ToString, message: impl ToString) -> Self {
        Self(vec![Violation {
            field: field.to_string(),
            message: message.to_string(),
        }])
    }

    pub fn violations(&self) -> &[Violation] {
        &self.0
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Validation failed: ")?;
        for (i, Violation { field, message }) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

// === impl Violations ===

impl Violations {
    fn push(&mut self, field: impl ToString, message: impl ToString) {
        self.0.push(Violation {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    fn not_blank(&mut self, field: &str, value: &str, message: &str) -> bool {
        if value.trim().is_empty() {
            self.push(field, message);
            return false;
        }
        true
    }

    fn label(&mut self, field: &str, value: &str, what: &str) {
        if value.len() > DNS_1123_LABEL_MAX_LEN {
            self.push(
                field,
                format!("{what} must not exceed {DNS_1123_LABEL_MAX_LEN} characters"),
            );
        }
        if !DNS_1123_LABEL.is_match(value) {
            self.push(field, format!("{what} must be a valid DNS-1123 label"));
        }
    }

    fn into_result(self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            return Ok(());
        }
        Err(ValidationError(self.0))
    }
}

// === impl NamespaceRequest ===

impl Validate for NamespaceRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Violations::default();
        if v.not_blank("name", &self.name, "Namespace name cannot be blank") {
            v.label("name", &self.name, "Namespace name");
        }
        v.into_result()
    }
}

// === impl ServiceAccountRequest ===

impl Validate for ServiceAccountRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Violations::default();
        if v.not_blank("namespace", &self.namespace, "Namespace name cannot be blank") {
            v.label("namespace", &self.namespace, "Namespace name");
        }
        if v.not_blank("name", &self.name, "Service account name cannot be blank") {
            v.label("name", &self.name, "Service account name");
        }
        v.into_result()
    }
}

// === impl PolicyRequest ===

impl Validate for PolicyRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Violations::default();

        if let Some(name) = self.explicit_name() {
            v.label("name", name, "Policy name");
        }

        if v.not_blank("namespace", &self.namespace, "Namespace cannot be blank") {
            v.label("namespace", &self.namespace, "Namespace");
        }

        if self.labels.as_ref().map_or(true, Map::is_empty) {
            v.push("labels", "Labels cannot be empty");
        }

        for (rule_type, rules) in self.rule_lists() {
            for (i, rule) in rules.iter().enumerate() {
                let field = format!("{}[{i}]", rule_type.field());
                validate_rule(&mut v, &field, rule_type, rule);
            }
        }

        v.into_result()
    }
}

fn validate_rule(v: &mut Violations, field: &str, list: RuleType, rule: &NetworkRule) {
    if rule.rule_type != list {
        v.push(format!("{field}.ruleType"), format!("ruleType must be {list}"));
    }
    let direction = list.direction();

    let has_ips = rule.has_ip_addresses();
    let has_labels = rule.has_labels();
    match (has_ips, has_labels) {
        (false, false) => v.push(field, "NetworkRule must specify either IP addresses or labels"),
        (true, true) => v.push(field, "NetworkRule cannot have both IP addresses and labels"),
        _ => {}
    }

    // Only the label set matching the rule's list direction is ever applied.
    let (wrong, wrong_field) = match direction {
        Direction::Ingress => (rule.labels_for(Direction::Egress), "toLabels"),
        Direction::Egress => (rule.labels_for(Direction::Ingress), "fromLabels"),
    };
    if wrong.is_some() {
        let allowed = match direction {
            Direction::Ingress => "ingress rules must use fromLabels",
            Direction::Egress => "egress rules must use toLabels",
        };
        v.push(format!("{field}.{wrong_field}"), allowed);
    }

    for (i, ip) in rule.ip_addresses.iter().flatten().enumerate() {
        if ip.parse::<ipnet::IpNet>().is_err() {
            v.push(format!("{field}.ipAddresses[{i}]"), "Invalid CIDR format");
        }
    }

    for (i, port) in rule.ports.iter().flatten().enumerate() {
        validate_port(v, &format!("{field}.ports[{i}]"), port);
    }
}

fn validate_port(v: &mut Violations, field: &str, port: &PortRule) {
    if port.port == 0 {
        v.push(format!("{field}.port"), "Port must be between 1 and 65535");
    }
    if let Some(end) = port.end_port {
        if end < port.port {
            v.push(
                format!("{field}.endPort"),
                "End port must be greater than or equal to port",
            );
        }
    }

    let headers = port.header_matches.as_deref().unwrap_or_default();
    if !headers.is_empty() && port.protocol != Protocol::Tcp {
        v.push(
            format!("{field}.headerMatches"),
            "Header matches are only supported for TCP ports",
        );
    }
    for (i, HeaderMatch { name, value }) in headers.iter().enumerate() {
        let field = format!("{field}.headerMatches[{i}]");
        v.not_blank(&format!("{field}.name"), name, "Header name cannot be blank");
        v.not_blank(&format!("{field}.value"), value, "Header value cannot be blank");
    }
}
