use crate::k8s::{
    Api, CiliumNetworkPolicy, Client, DynamicObject, Error, Namespace, ServiceAccount,
};
use kube::api::{DeleteParams, ListParams, PostParams};

const FIELD_MANAGER: &str = "cilium-policy-api";

/// The subset of the Kubernetes API used to provision resources.
///
/// Every call is a single request against the API server: nothing is cached,
/// watched or retried.
#[async_trait::async_trait]
pub trait Cluster: Clone + Send + Sync + 'static {
    /// Issues a cheap request to check that the API server is reachable.
    async fn ping(&self) -> Result<(), Error>;

    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, Error>;

    async fn create_namespace(&self, ns: &Namespace) -> Result<Namespace, Error>;

    async fn get_service_account(
        &self,
        ns: &str,
        name: &str,
    ) -> Result<Option<ServiceAccount>, Error>;

    async fn create_service_account(
        &self,
        ns: &str,
        sa: &ServiceAccount,
    ) -> Result<ServiceAccount, Error>;

    async fn get_policy(&self, ns: &str, name: &str) -> Result<Option<DynamicObject>, Error>;

    /// Lists policies in `ns`, or in all namespaces when `ns` is `None`.
    async fn list_policies(&self, ns: Option<&str>) -> Result<Vec<DynamicObject>, Error>;

    async fn create_policy(
        &self,
        ns: &str,
        policy: &CiliumNetworkPolicy,
    ) -> Result<CiliumNetworkPolicy, Error>;

    /// Deletes a policy, returning false if it did not exist.
    async fn delete_policy(&self, ns: &str, name: &str) -> Result<bool, Error>;

    async fn delete_policies(&self, ns: &str) -> Result<(), Error>;
}

#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

// === impl KubeCluster ===

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn policies(&self, ns: Option<&str>) -> Api<DynamicObject> {
        let ar = CiliumNetworkPolicy::api_resource();
        match ns {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &ar),
            None => Api::all_with(self.client.clone(), &ar),
        }
    }
}

#[async_trait::async_trait]
impl Cluster for KubeCluster {
    async fn ping(&self) -> Result<(), Error> {
        Api::<Namespace>::all(self.client.clone())
            .list(&ListParams::default().limit(1))
            .await?;
        Ok(())
    }

    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, Error> {
        Api::<Namespace>::all(self.client.clone()).get_opt(name).await
    }

    async fn create_namespace(&self, ns: &Namespace) -> Result<Namespace, Error> {
        Api::<Namespace>::all(self.client.clone())
            .create(&post_params(), ns)
            .await
    }

    async fn get_service_account(
        &self,
        ns: &str,
        name: &str,
    ) -> Result<Option<ServiceAccount>, Error> {
        Api::<ServiceAccount>::namespaced(self.client.clone(), ns)
            .get_opt(name)
            .await
    }

    async fn create_service_account(
        &self,
        ns: &str,
        sa: &ServiceAccount,
    ) -> Result<ServiceAccount, Error> {
        Api::<ServiceAccount>::namespaced(self.client.clone(), ns)
            .create(&post_params(), sa)
            .await
    }

    async fn get_policy(&self, ns: &str, name: &str) -> Result<Option<DynamicObject>, Error> {
        self.policies(Some(ns)).get_opt(name).await
    }

    async fn list_policies(&self, ns: Option<&str>) -> Result<Vec<DynamicObject>, Error> {
        let list = self.policies(ns).list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn create_policy(
        &self,
        ns: &str,
        policy: &CiliumNetworkPolicy,
    ) -> Result<CiliumNetworkPolicy, Error> {
        Api::<CiliumNetworkPolicy>::namespaced(self.client.clone(), ns)
            .create(&post_params(), policy)
            .await
    }

    async fn delete_policy(&self, ns: &str, name: &str) -> Result<bool, Error> {
        match self
            .policies(Some(ns))
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(true),
            Err(Error::Api(rsp)) if rsp.code == 404 => Ok(false),
            Err(error) => Err(error),
        }
    }

    async fn delete_policies(&self, ns: &str) -> Result<(), Error> {
        self.policies(Some(ns))
            .delete_collection(&DeleteParams::default(), &ListParams::default())
            .await?;
        Ok(())
    }
}
