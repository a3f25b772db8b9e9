use crate::{
    core::{NamespaceRequest, NamespaceResponse, Status},
    k8s::{Namespace, ObjectMeta},
    Cluster, Error, Provisioner,
};
use tracing::{info, warn};

impl<C: Cluster> Provisioner<C> {
    /// Creates a namespace unless one with the same name already exists.
    pub async fn create_namespace(
        &self,
        req: &NamespaceRequest,
    ) -> Result<NamespaceResponse, Error> {
        let name = req.name.as_str();
        info!(%name, "Creating namespace");

        let existing = self
            .cluster
            .get_namespace(name)
            .await
            .map_err(Error::cluster("Failed to create namespace"))?;
        if let Some(ns) = existing {
            warn!(%name, "Namespace already exists");
            return Ok(NamespaceResponse {
                name: name.to_string(),
                status: Status::Exists,
                creation_timestamp: ns.metadata.creation_timestamp.map(|t| t.0),
                message: "Namespace already exists".to_string(),
            });
        }

        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(self.labels()),
                ..Default::default()
            },
            ..Default::default()
        };
        let created = self.cluster.create_namespace(&ns).await.map_err(|error| {
            tracing::error!(%error, %name, "Failed to create namespace");
            Error::Cluster {
                context: "Failed to create namespace",
                source: error,
            }
        })?;
        info!(%name, "Created namespace");

        Ok(NamespaceResponse {
            name: name.to_string(),
            status: Status::Created,
            creation_timestamp: created.metadata.creation_timestamp.map(|t| t.0),
            message: "Namespace created successfully".to_string(),
        })
    }
}
