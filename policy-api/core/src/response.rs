use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The outcome of an idempotent create.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Created,
    Exists,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceResponse {
    pub name: String,
    pub status: Status,
    pub creation_timestamp: Option<DateTime<Utc>>,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountResponse {
    pub name: String,
    pub namespace: String,
    pub status: Status,
    pub creation_timestamp: Option<DateTime<Utc>>,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyResponse {
    pub name: String,
    pub namespace: String,
    pub status: Status,
    pub created_at: Option<DateTime<Utc>>,
    pub message: String,
    /// The name the policy was stored under, whether generated or supplied.
    pub generated_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_name: Option<String>,
    pub namespace: String,
    pub deleted_count: usize,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct HealthResponse {
    pub message: String,
    pub status: HealthStatus,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

// === impl Status ===

impl Status {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created)
    }
}

// === impl DeleteResponse ===

impl DeleteResponse {
    pub fn one(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            message: "CiliumNetworkPolicy deleted successfully".to_string(),
            policy_name: Some(name.into()),
            namespace: namespace.into(),
            deleted_count: 1,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn all(namespace: impl Into<String>, deleted_count: usize) -> Self {
        let message = if deleted_count > 0 {
            format!("Successfully deleted {deleted_count} CiliumNetworkPolicies")
        } else {
            "No CiliumNetworkPolicies found to delete".to_string()
        };
        Self {
            message,
            policy_name: None,
            namespace: namespace.into(),
            deleted_count,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

// === impl HealthResponse ===

impl HealthResponse {
    pub fn new(status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}
