use crate::{
    core::{ServiceAccountRequest, ServiceAccountResponse, Status},
    error::is_not_found,
    k8s::{ObjectMeta, ServiceAccount},
    Cluster, Error, Provisioner,
};
use tracing::{info, warn};

impl<C: Cluster> Provisioner<C> {
    /// Creates a service account in an existing namespace unless one with the
    /// same name is already there.
    pub async fn create_service_account(
        &self,
        req: &ServiceAccountRequest,
    ) -> Result<ServiceAccountResponse, Error> {
        let ServiceAccountRequest { namespace, name } = req;
        info!(%namespace, %name, "Creating service account");

        self.require_namespace(namespace).await?;

        let existing = self
            .cluster
            .get_service_account(namespace, name)
            .await
            .map_err(Error::cluster("Failed to create service account"))?;
        if let Some(sa) = existing {
            warn!(%namespace, %name, "Service account already exists");
            return Ok(ServiceAccountResponse {
                name: name.clone(),
                namespace: namespace.clone(),
                status: Status::Exists,
                creation_timestamp: sa.metadata.creation_timestamp.map(|t| t.0),
                message: "Service account already exists".to_string(),
            });
        }

        let sa = ServiceAccount {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                namespace: Some(namespace.clone()),
                labels: Some(self.labels()),
                ..Default::default()
            },
            ..Default::default()
        };
        let created = match self.cluster.create_service_account(namespace, &sa).await {
            Ok(sa) => sa,
            // The namespace was removed after it was checked.
            Err(error) if is_not_found(&error) => {
                return Err(Error::NamespaceNotFound(namespace.clone()))
            }
            Err(error) => {
                tracing::error!(%error, %namespace, %name, "Failed to create service account");
                return Err(Error::Cluster {
                    context: "Failed to create service account",
                    source: error,
                });
            }
        };
        info!(%namespace, %name, "Created service account");

        Ok(ServiceAccountResponse {
            name: name.clone(),
            namespace: namespace.clone(),
            status: Status::Created,
            creation_timestamp: created.metadata.creation_timestamp.map(|t| t.0),
            message: "Service account created successfully".to_string(),
        })
    }
}
