use crate::core::ValidationError;
use hyper::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Namespace '{0}' does not exist")]
    NamespaceNotFound(String),

    #[error("CiliumNetworkPolicy '{name}' not found in namespace '{namespace}'")]
    PolicyNotFound { namespace: String, name: String },

    #[error("{context}: {source}")]
    Cluster {
        context: &'static str,
        #[source]
        source: kube::Error,
    },

    #[error("CiliumNetworkPolicy {namespace}/{name} has an invalid spec: {source}")]
    InvalidSpec {
        namespace: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Unexpected(String),
}

/// The JSON body returned for every failed request.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_code: &'static str,
    pub message: String,
    pub status_code: u16,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

// === impl Error ===

impl Error {
    pub(crate) fn cluster(context: &'static str) -> impl FnOnce(kube::Error) -> Self {
        move |source| Self::Cluster { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NamespaceNotFound(_) | Self::PolicyNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Cluster { .. } | Self::InvalidSpec { .. } | Self::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::NamespaceNotFound(_) | Self::PolicyNotFound { .. } => "NOT_FOUND",
            Self::Cluster { .. } => "CLUSTER_ERROR",
            Self::InvalidSpec { .. } | Self::Unexpected(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Service accounts report a missing namespace as a bad request rather
    /// than as a missing resource.
    pub(crate) fn missing_namespace_as_bad_request(self) -> Self {
        match self {
            Self::NamespaceNotFound(ns) => {
                Self::BadRequest(format!("Namespace '{ns}' does not exist"))
            }
            error => error,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error_code: self.code(),
            message: self.to_string(),
            status_code: self.status().as_u16(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Returns true if the API server reported that the object does not exist.
pub(crate) fn is_not_found(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(rsp) if rsp.code == StatusCode::NOT_FOUND.as_u16())
}
