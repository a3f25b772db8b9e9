use super::*;
use crate::{api::Body, ApiService};
use http_body_util::BodyExt;
use hyper::{Method, Request, Response, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

impl TestConfig {
    fn api(&self) -> ApiService<MockCluster> {
        ApiService::new(self.provisioner.clone(), self.metrics.clone())
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
        let body = body
            .map(|b| Body::from(serde_json::to_vec(&b).unwrap()))
            .unwrap_or_default();
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        self.api().oneshot(req).await.unwrap()
    }
}

async fn json_body(rsp: Response<Body>) -> Value {
    let bytes = rsp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn serves_info_and_hello() {
    let test = TestConfig::new();

    let rsp = test.send(Method::GET, "/", None).await;
    assert_eq!(rsp.status(), StatusCode::OK);
    let info = json_body(rsp).await;
    assert_eq!(info["service"], "cilium-policy-api");
    assert_eq!(
        info["endpoints"]["Cilium Network Policies"],
        "/api/v1/cilium-network-policies"
    );

    let rsp = test.send(Method::GET, "/hello", None).await;
    assert_eq!(rsp.status(), StatusCode::OK);
    let bytes = rsp.into_body().collect().await.unwrap().to_bytes();
    assert!(std::str::from_utf8(&bytes).unwrap().starts_with("Hello from"));
}

#[tokio::test]
async fn namespace_create_then_exists() {
    let test = TestConfig::new();
    let body = json!({ "name": "tenant-a" });

    let rsp = test
        .send(Method::POST, "/api/v1/namespaces", Some(body.clone()))
        .await;
    assert_eq!(rsp.status(), StatusCode::CREATED);
    let created = json_body(rsp).await;
    assert_eq!(created["status"], "CREATED");
    assert_eq!(created["name"], "tenant-a");
    assert!(created["creationTimestamp"].is_string(), "{created}");

    let rsp = test
        .send(Method::POST, "/api/v1/namespaces", Some(body))
        .await;
    assert_eq!(rsp.status(), StatusCode::OK);
    assert_eq!(json_body(rsp).await["status"], "EXISTS");

    assert_eq!(test.metrics.requests("namespaces", "POST", 201), 1);
    assert_eq!(test.metrics.requests("namespaces", "POST", 200), 1);
}

#[tokio::test]
async fn rejects_invalid_namespace_name() {
    let test = TestConfig::new();

    let rsp = test
        .send(
            Method::POST,
            "/api/v1/namespaces",
            Some(json!({ "name": "Tenant_A" })),
        )
        .await;
    assert_eq!(rsp.status(), StatusCode::BAD_REQUEST);
    let error = json_body(rsp).await;
    assert_eq!(error["errorCode"], "VALIDATION_ERROR");
    assert_eq!(error["statusCode"], 400);
    assert!(error["timestamp"].is_i64(), "{error}");
    assert!(test.cluster.state.lock().namespaces.is_empty());
}

#[tokio::test]
async fn rejects_malformed_body() {
    let test = TestConfig::new();

    let req = Request::post("/api/v1/namespaces")
        .body(Body::from("{not json"))
        .unwrap();
    let rsp = test.api().oneshot(req).await.unwrap();
    assert_eq!(rsp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(rsp).await["errorCode"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn service_account_in_missing_namespace_is_bad_request() {
    let test = TestConfig::new();

    let rsp = test
        .send(
            Method::POST,
            "/api/v1/serviceaccounts",
            Some(json!({ "namespace": "tenant-a", "name": "builder" })),
        )
        .await;
    assert_eq!(rsp.status(), StatusCode::BAD_REQUEST);
    let error = json_body(rsp).await;
    assert_eq!(error["errorCode"], "BAD_REQUEST");
    assert_eq!(error["message"], "Namespace 'tenant-a' does not exist");

    test.cluster.add_namespace("tenant-a");
    let rsp = test
        .send(
            Method::POST,
            "/api/v1/serviceaccounts",
            Some(json!({ "namespace": "tenant-a", "name": "builder" })),
        )
        .await;
    assert_eq!(rsp.status(), StatusCode::CREATED);
    let created = json_body(rsp).await;
    assert_eq!(created["namespace"], "tenant-a");
    assert_eq!(created["status"], "CREATED");
}

#[tokio::test]
async fn policy_in_missing_namespace_is_not_found() {
    let test = TestConfig::new();

    let rsp = test
        .send(
            Method::POST,
            "/api/v1/cilium-network-policies",
            Some(json!({ "namespace": "tenant-a", "labels": { "app": "web" } })),
        )
        .await;
    assert_eq!(rsp.status(), StatusCode::NOT_FOUND);
    let error = json_body(rsp).await;
    assert_eq!(error["errorCode"], "NOT_FOUND");
    assert_eq!(error["message"], "Namespace 'tenant-a' does not exist");
}

#[tokio::test]
async fn policy_lifecycle() {
    let test = TestConfig::new();
    test.cluster.add_namespace("tenant-a");

    let rsp = test
        .send(
            Method::POST,
            "/api/v1/cilium-network-policies",
            Some(json!({
                "namespace": "tenant-a",
                "labels": { "app": "web" },
                "egressRules": [{
                    "ruleType": "EGRESS_ALLOW",
                    "ipAddresses": ["10.0.0.0/8"],
                    "ports": [{ "protocol": "TCP", "port": 443 }],
                }],
            })),
        )
        .await;
    assert_eq!(rsp.status(), StatusCode::CREATED);
    let created = json_body(rsp).await;
    assert_eq!(created["generatedName"], "web-abcdef");
    assert_eq!(created["name"], "web-abcdef");

    let rsp = test
        .send(
            Method::GET,
            "/api/v1/cilium-network-policies/web-abcdef?namespace=tenant-a",
            None,
        )
        .await;
    assert_eq!(rsp.status(), StatusCode::OK);
    assert_eq!(
        json_body(rsp).await,
        json!({
            "name": "web-abcdef",
            "namespace": "tenant-a",
            "labels": { "app": "web" },
            "egressRules": [{
                "ruleType": "EGRESS_ALLOW",
                "ipAddresses": ["10.0.0.0/8"],
                "ports": [{ "protocol": "TCP", "port": 443 }],
            }],
        })
    );

    let rsp = test
        .send(Method::GET, "/api/v1/cilium-network-policies/namespace/tenant-a", None)
        .await;
    assert_eq!(rsp.status(), StatusCode::OK);
    assert_eq!(json_body(rsp).await.as_array().map(Vec::len), Some(1));

    let rsp = test
        .send(
            Method::GET,
            "/api/v1/cilium-network-policies/endpoint-selector?labels=app%3Dweb",
            None,
        )
        .await;
    assert_eq!(rsp.status(), StatusCode::OK);
    assert_eq!(json_body(rsp).await[0]["name"], "web-abcdef");

    let rsp = test
        .send(
            Method::DELETE,
            "/api/v1/cilium-network-policies/web-abcdef?namespace=tenant-a",
            None,
        )
        .await;
    assert_eq!(rsp.status(), StatusCode::OK);
    let deleted = json_body(rsp).await;
    assert_eq!(deleted["message"], "CiliumNetworkPolicy deleted successfully");
    assert_eq!(deleted["policyName"], "web-abcdef");
    assert_eq!(deleted["deletedCount"], 1);

    let rsp = test
        .send(
            Method::DELETE,
            "/api/v1/cilium-network-policies/web-abcdef?namespace=tenant-a",
            None,
        )
        .await;
    assert_eq!(rsp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_requires_namespace_query() {
    let test = TestConfig::new();

    let rsp = test
        .send(Method::GET, "/api/v1/cilium-network-policies/web", None)
        .await;
    assert_eq!(rsp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(rsp).await["errorCode"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn endpoint_selector_requires_labels() {
    let test = TestConfig::new();

    let rsp = test
        .send(
            Method::GET,
            "/api/v1/cilium-network-policies/endpoint-selector?labels=app",
            None,
        )
        .await;
    assert_eq!(rsp.status(), StatusCode::BAD_REQUEST);
    let error = json_body(rsp).await;
    assert_eq!(error["errorCode"], "BAD_REQUEST");
    assert_eq!(
        error["message"],
        "Invalid labels parameter: Invalid label format. Expected: key=value,key2=value2"
    );
}

#[tokio::test]
async fn deletes_all_policies() {
    let test = TestConfig::new();
    test.cluster.add_namespace("tenant-a");
    for i in 0..5 {
        test.cluster
            .add_policy("tenant-a", &format!("p{i}"), json!({}));
    }

    let uri = "/api/v1/cilium-network-policies/namespace/tenant-a";
    let rsp = test.send(Method::DELETE, uri, None).await;
    assert_eq!(rsp.status(), StatusCode::OK);
    let deleted = json_body(rsp).await;
    assert_eq!(deleted["deletedCount"], 5);
    assert_eq!(deleted["namespace"], "tenant-a");
    assert_eq!(
        deleted["message"],
        "Successfully deleted 5 CiliumNetworkPolicies"
    );
    assert!(deleted.get("policyName").is_none(), "{deleted}");

    let rsp = test.send(Method::DELETE, uri, None).await;
    let deleted = json_body(rsp).await;
    assert_eq!(deleted["deletedCount"], 0);
    assert_eq!(deleted["message"], "No CiliumNetworkPolicies found to delete");
}

#[tokio::test]
async fn health_reflects_cluster() {
    let test = TestConfig::new();

    let rsp = test
        .send(Method::GET, "/api/v1/namespaces/health", None)
        .await;
    assert_eq!(rsp.status(), StatusCode::OK);
    assert_eq!(json_body(rsp).await["status"], "UP");

    test.cluster.set_unavailable();

    let rsp = test
        .send(Method::GET, "/api/v1/namespaces/health", None)
        .await;
    assert_eq!(rsp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let health = json_body(rsp).await;
    assert_eq!(health["status"], "DOWN");
    assert_eq!(health["message"], "Kubernetes is not available");

    let rsp = test
        .send(Method::GET, "/api/v1/cilium-network-policies/health", None)
        .await;
    assert_eq!(rsp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        json_body(rsp).await["message"],
        "CiliumNetworkPolicy service cannot connect to Kubernetes"
    );
}

#[tokio::test]
async fn cluster_failures_are_server_errors() {
    let test = TestConfig::new();
    test.cluster.set_unavailable();

    let rsp = test
        .send(
            Method::POST,
            "/api/v1/namespaces",
            Some(json!({ "name": "tenant-a" })),
        )
        .await;
    assert_eq!(rsp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(rsp).await["errorCode"], "CLUSTER_ERROR");
}

#[tokio::test]
async fn unknown_routes() {
    let test = TestConfig::new();

    let rsp = test.send(Method::GET, "/api/v2/nothing", None).await;
    assert_eq!(rsp.status(), StatusCode::NOT_FOUND);
    let error = json_body(rsp).await;
    assert_eq!(error["errorCode"], "NOT_FOUND");
    assert_eq!(error["message"], "No route for GET /api/v2/nothing");

    let rsp = test.send(Method::GET, "/api/v1/namespaces", None).await;
    assert_eq!(rsp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json_body(rsp).await["errorCode"], "METHOD_NOT_ALLOWED");

    assert_eq!(test.metrics.requests("unknown", "GET", 404), 1);
    assert_eq!(test.metrics.requests("namespaces", "GET", 405), 1);
}
