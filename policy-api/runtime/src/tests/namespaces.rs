use super::*;
use crate::core::{NamespaceRequest, Status};
use maplit::{btreemap, convert_args};

#[tokio::test]
async fn creates_missing_namespace() {
    let test = TestConfig::new();
    let req = NamespaceRequest {
        name: "tenant-a".to_string(),
    };

    let rsp = test.provisioner.create_namespace(&req).await.unwrap();
    assert_eq!(rsp.name, "tenant-a");
    assert_eq!(rsp.status, Status::Created);
    assert_eq!(rsp.message, "Namespace created successfully");
    assert!(rsp.creation_timestamp.is_some());

    let ns = test.cluster.state.lock().namespaces["tenant-a"].clone();
    assert_eq!(
        ns.metadata.labels,
        Some(convert_args!(btreemap!(
            "created-by" => "ppcs-nsm",
            "managed-by" => "cilium-policy-api"
        )))
    );
}

#[tokio::test]
async fn reports_existing_namespace() {
    let test = TestConfig::new();
    test.cluster.add_namespace("tenant-a");
    let req = NamespaceRequest {
        name: "tenant-a".to_string(),
    };

    let rsp = test.provisioner.create_namespace(&req).await.unwrap();
    assert_eq!(rsp.status, Status::Exists);
    assert_eq!(rsp.message, "Namespace already exists");
    assert!(rsp.creation_timestamp.is_some());
}

#[tokio::test]
async fn surfaces_cluster_failures() {
    let test = TestConfig::new();
    test.cluster.set_unavailable();
    let req = NamespaceRequest {
        name: "tenant-a".to_string(),
    };

    let error = test.provisioner.create_namespace(&req).await.unwrap_err();
    assert!(matches!(error, crate::Error::Cluster { .. }), "{error:?}");
    assert_eq!(error.code(), "CLUSTER_ERROR");
    assert!(!test.provisioner.is_available().await);
}
