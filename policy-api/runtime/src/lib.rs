#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use cilium_policy_api_core as core;
pub use cilium_policy_api_k8s_api as k8s;

pub mod api;
mod args;
pub mod cluster;
mod error;
mod metrics;
mod namespaces;
mod policies;
mod server;
mod service_accounts;


pub use self::{
    api::ApiService,
    args::Args,
    cluster::{Cluster, KubeCluster},
    error::{Error, ErrorResponse},
    metrics::HttpMetrics,
};

use crate::core::Map;
use parking_lot::Mutex;
use rand::RngCore;
use std::sync::Arc;

const CREATED_BY_LABEL: &str = "created-by";
const MANAGED_BY_LABEL: &str = "managed-by";

/// Creates, reads and deletes namespaces, service accounts and
/// `CiliumNetworkPolicy` resources through a [`Cluster`].
#[derive(Clone)]
pub struct Provisioner<C> {
    cluster: C,
    managed_by: ManagedBy,
    rng: Arc<Mutex<Box<dyn RngCore + Send>>>,
}

/// Values of the management labels attached to every created object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagedBy {
    pub created_by: String,
    pub managed_by: String,
}

// === impl Provisioner ===

impl<C: Cluster> Provisioner<C> {
    pub fn new(cluster: C, managed_by: ManagedBy, rng: Box<dyn RngCore + Send>) -> Self {
        Self {
            cluster,
            managed_by,
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    /// Returns true if the Kubernetes API is reachable.
    pub async fn is_available(&self) -> bool {
        match self.cluster.ping().await {
            Ok(()) => true,
            Err(error) => {
                tracing::error!(%error, "Kubernetes is not available");
                false
            }
        }
    }

    /// Fails with [`Error::NamespaceNotFound`] unless `ns` exists.
    async fn require_namespace(&self, ns: &str) -> Result<(), Error> {
        let found = self
            .cluster
            .get_namespace(ns)
            .await
            .map_err(Error::cluster("Failed to look up namespace"))?;
        if found.is_none() {
            tracing::warn!(namespace = %ns, "Namespace does not exist");
            return Err(Error::NamespaceNotFound(ns.to_string()));
        }
        Ok(())
    }

    fn labels(&self) -> Map {
        self.managed_by.labels()
    }
}

// === impl ManagedBy ===

impl ManagedBy {
    pub fn labels(&self) -> Map {
        [
            (CREATED_BY_LABEL.to_string(), self.created_by.clone()),
            (MANAGED_BY_LABEL.to_string(), self.managed_by.clone()),
        ]
        .into_iter()
        .collect()
    }
}

impl Default for ManagedBy {
    fn default() -> Self {
        Self {
            created_by: "ppcs-nsm".to_string(),
            managed_by: "cilium-policy-api".to_string(),
        }
    }
}
