use super::*;
use crate::{
    core::{ServiceAccountRequest, Status},
    Error,
};

fn request(namespace: &str, name: &str) -> ServiceAccountRequest {
    ServiceAccountRequest {
        namespace: namespace.to_string(),
        name: name.to_string(),
    }
}

#[tokio::test]
async fn creates_then_reports_existing() {
    let test = TestConfig::new();
    test.cluster.add_namespace("tenant-a");

    let rsp = test
        .provisioner
        .create_service_account(&request("tenant-a", "builder"))
        .await
        .unwrap();
    assert_eq!(rsp.status, Status::Created);
    assert_eq!(rsp.namespace, "tenant-a");
    assert_eq!(rsp.name, "builder");
    assert_eq!(rsp.message, "Service account created successfully");

    let rsp = test
        .provisioner
        .create_service_account(&request("tenant-a", "builder"))
        .await
        .unwrap();
    assert_eq!(rsp.status, Status::Exists);
    assert_eq!(rsp.message, "Service account already exists");
}

#[tokio::test]
async fn requires_namespace() {
    let test = TestConfig::new();

    let error = test
        .provisioner
        .create_service_account(&request("tenant-a", "builder"))
        .await
        .unwrap_err();
    assert!(
        matches!(&error, Error::NamespaceNotFound(ns) if ns == "tenant-a"),
        "{error:?}"
    );
    assert!(test.cluster.state.lock().service_accounts.is_empty());
}
