use crate::{
    core::{generate_name, matches, translate, Map, PolicyRequest, PolicyResponse, Status},
    error::is_not_found,
    k8s::{CiliumNetworkPolicy, DynamicObject, ObjectMeta, ResourceExt},
    Cluster, Error, Provisioner,
};
use tracing::{debug, info, warn};

impl<C: Cluster> Provisioner<C> {
    /// Creates a policy from a validated request unless a policy with the same
    /// name already exists in the namespace.
    ///
    /// When the request carries no name, one is generated from its labels.
    pub async fn create_policy(&self, req: &PolicyRequest) -> Result<PolicyResponse, Error> {
        let name = self.policy_name(req);
        let namespace = req.namespace.as_str();
        info!(%namespace, %name, "Creating CiliumNetworkPolicy");

        self.require_namespace(namespace).await?;

        let existing = self
            .cluster
            .get_policy(namespace, &name)
            .await
            .map_err(Error::cluster("Failed to create CiliumNetworkPolicy"))?;
        if let Some(obj) = existing {
            warn!(%namespace, %name, "CiliumNetworkPolicy already exists");
            return Ok(PolicyResponse {
                name: name.clone(),
                namespace: namespace.to_string(),
                status: Status::Exists,
                created_at: obj.metadata.creation_timestamp.map(|t| t.0),
                message: "CiliumNetworkPolicy already exists".to_string(),
                generated_name: name,
            });
        }

        let policy = CiliumNetworkPolicy {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                namespace: Some(namespace.to_string()),
                labels: Some(self.labels()),
                ..Default::default()
            },
            spec: translate::to_spec(req),
        };
        debug!(?policy);

        let created = match self.cluster.create_policy(namespace, &policy).await {
            Ok(created) => created,
            Err(error) if is_not_found(&error) => {
                return Err(Error::NamespaceNotFound(namespace.to_string()))
            }
            Err(error) => {
                tracing::error!(%error, %namespace, %name, "Failed to create CiliumNetworkPolicy");
                return Err(Error::Cluster {
                    context: "Failed to create CiliumNetworkPolicy",
                    source: error,
                });
            }
        };
        info!(%namespace, %name, "Created CiliumNetworkPolicy");

        Ok(PolicyResponse {
            name: name.clone(),
            namespace: namespace.to_string(),
            status: Status::Created,
            created_at: created.metadata.creation_timestamp.map(|t| t.0),
            message: "CiliumNetworkPolicy created successfully".to_string(),
            generated_name: name,
        })
    }

    pub async fn get_policy(&self, namespace: &str, name: &str) -> Result<PolicyRequest, Error> {
        info!(%namespace, %name, "Getting CiliumNetworkPolicy");
        self.require_namespace(namespace).await?;

        let obj = self
            .cluster
            .get_policy(namespace, name)
            .await
            .map_err(Error::cluster("Failed to get CiliumNetworkPolicy"))?
            .ok_or_else(|| Error::PolicyNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;
        read_policy(&obj)
    }

    pub async fn list_policies(&self, namespace: &str) -> Result<Vec<PolicyRequest>, Error> {
        info!(%namespace, "Getting all CiliumNetworkPolicies");
        self.require_namespace(namespace).await?;

        let objs = self
            .cluster
            .list_policies(Some(namespace))
            .await
            .map_err(Error::cluster("Failed to get CiliumNetworkPolicies"))?;
        objs.iter().map(read_policy).collect()
    }

    /// Finds policies whose endpoint selector contains every label in
    /// `labels`, searching all namespaces when `namespace` is `None`.
    pub async fn find_policies(
        &self,
        namespace: Option<&str>,
        labels: &Map,
    ) -> Result<Vec<PolicyRequest>, Error> {
        info!(
            namespace = namespace.unwrap_or("*"),
            ?labels,
            "Getting CiliumNetworkPolicies by endpoint selector"
        );
        if let Some(ns) = namespace {
            self.require_namespace(ns).await?;
        }

        let objs = self
            .cluster
            .list_policies(namespace)
            .await
            .map_err(Error::cluster("Failed to get CiliumNetworkPolicies"))?;
        let found = objs
            .iter()
            .filter(|obj| matches(obj, labels))
            .map(read_policy)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(total = objs.len(), matched = found.len());
        Ok(found)
    }

    /// Deletes a policy, returning false if it did not exist.
    pub async fn delete_policy(&self, namespace: &str, name: &str) -> Result<bool, Error> {
        info!(%namespace, %name, "Deleting CiliumNetworkPolicy");
        self.require_namespace(namespace).await?;

        let deleted = self
            .cluster
            .delete_policy(namespace, name)
            .await
            .map_err(Error::cluster("Failed to delete CiliumNetworkPolicy"))?;
        if deleted {
            info!(%namespace, %name, "Deleted CiliumNetworkPolicy");
        } else {
            warn!(%namespace, %name, "CiliumNetworkPolicy not found");
        }
        Ok(deleted)
    }

    /// Deletes every policy in the namespace, returning how many there were.
    pub async fn delete_policies(&self, namespace: &str) -> Result<usize, Error> {
        info!(%namespace, "Deleting all CiliumNetworkPolicies");
        self.require_namespace(namespace).await?;

        let count = self
            .cluster
            .list_policies(Some(namespace))
            .await
            .map_err(Error::cluster("Failed to delete all CiliumNetworkPolicies"))?
            .len();
        if count == 0 {
            info!(%namespace, "No CiliumNetworkPolicies found to delete");
            return Ok(0);
        }

        self.cluster
            .delete_policies(namespace)
            .await
            .map_err(Error::cluster("Failed to delete all CiliumNetworkPolicies"))?;
        info!(%namespace, count, "Deleted CiliumNetworkPolicies");
        Ok(count)
    }

    fn policy_name(&self, req: &PolicyRequest) -> String {
        if let Some(name) = req.explicit_name() {
            return name.to_string();
        }
        let mut rng = self.rng.lock();
        generate_name(req.labels.as_ref(), &mut **rng)
    }
}

fn read_policy(obj: &DynamicObject) -> Result<PolicyRequest, Error> {
    translate::from_object(obj).map_err(|source| Error::InvalidSpec {
        namespace: obj.namespace().unwrap_or_default(),
        name: obj.name_any(),
        source,
    })
}
