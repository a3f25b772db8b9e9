//! The JSON-over-HTTP API.

mod route;

use self::route::{Route, Unrecognized};
use crate::{
    core::{
        DeleteResponse, HealthResponse, HealthStatus, Map, NamespaceRequest, PolicyRequest,
        ServiceAccountRequest, Status, Validate, ValidationError,
    },
    error::ErrorResponse,
    Cluster, Error, HttpMetrics, Provisioner,
};
use futures::future;
use http_body_util::BodyExt;
use hyper::{
    http::{self, StatusCode},
    Request, Response,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::convert::Infallible;
use tokio::time;
use tracing::{debug, error, info, info_span, Instrument};

pub type Body = http_body_util::Full<bytes::Bytes>;

const SERVICE_NAME: &str = "cilium-policy-api";

const HELLO: &str = "Hello from cilium-policy-api - your network security manager is running!";

/// Serves the API on top of a [`Provisioner`].
#[derive(Clone)]
pub struct ApiService<C> {
    provisioner: Provisioner<C>,
    metrics: HttpMetrics,
}

#[derive(Debug, Default, Deserialize)]
struct Query {
    namespace: Option<String>,
    labels: Option<String>,
}

// === impl ApiService ===

impl<C: Cluster> ApiService<C> {
    pub fn new(provisioner: Provisioner<C>, metrics: HttpMetrics) -> Self {
        Self {
            provisioner,
            metrics,
        }
    }

    async fn handle<B>(self, req: Request<B>) -> Response<Body>
    where
        B: hyper::body::Body,
        B::Error: std::fmt::Display,
    {
        let start = time::Instant::now();
        let method = req.method().clone();
        debug!(uri = %req.uri(), "Handling request");

        let (name, rsp) = match Route::recognize(&method, req.uri().path()) {
            Ok(route) => {
                let name = route.name();
                let rsp = match self.route(route, req).await {
                    Ok(rsp) => rsp,
                    Err(error) => {
                        if error.status().is_server_error() {
                            error!(%error, "Request failed");
                        } else {
                            info!(%error, "Request rejected");
                        }
                        error_response(error.status(), &error.to_response())
                    }
                };
                (name, rsp)
            }
            Err(unrecognized) => {
                let (status, error_code) = match unrecognized {
                    Unrecognized::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                    Unrecognized::MethodNotAllowed(_) => {
                        (StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED")
                    }
                };
                let body = ErrorResponse {
                    error_code,
                    message: format!("No route for {method} {}", req.uri().path()),
                    status_code: status.as_u16(),
                    timestamp: chrono::Utc::now().timestamp_millis(),
                };
                (unrecognized.name(), error_response(status, &body))
            }
        };

        debug!(status = %rsp.status(), "Handled request");
        self.metrics.record(name, &method, rsp.status(), start);
        rsp
    }

    async fn route<B>(&self, route: Route, req: Request<B>) -> Result<Response<Body>, Error>
    where
        B: hyper::body::Body,
        B::Error: std::fmt::Display,
    {
        let p = &self.provisioner;
        match route {
            Route::Info => json_response(StatusCode::OK, &info()),

            Route::Hello => Ok(Response::builder()
                .status(StatusCode::OK)
                .header(http::header::CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(Body::from(HELLO))
                .expect("hello response must be valid")),

            Route::CreateNamespace => {
                let body = read_json::<NamespaceRequest, _>(req).await?;
                body.validate()?;
                let rsp = p.create_namespace(&body).await?;
                json_response(created_or_ok(rsp.status), &rsp)
            }

            Route::NamespacesHealth => health(
                p.is_available().await,
                "Kubernetes is available",
                "Kubernetes is not available",
            ),

            Route::CreateServiceAccount => {
                let body = read_json::<ServiceAccountRequest, _>(req).await?;
                body.validate()?;
                let rsp = p
                    .create_service_account(&body)
                    .await
                    .map_err(Error::missing_namespace_as_bad_request)?;
                json_response(created_or_ok(rsp.status), &rsp)
            }

            Route::CreatePolicy => {
                let body = read_json::<PolicyRequest, _>(req).await?;
                body.validate()?;
                let rsp = p.create_policy(&body).await?;
                json_response(created_or_ok(rsp.status), &rsp)
            }

            Route::PoliciesHealth => health(
                p.is_available().await,
                "CiliumNetworkPolicy service is healthy",
                "CiliumNetworkPolicy service cannot connect to Kubernetes",
            ),

            Route::FindPolicies => {
                let query = parse_query(&req)?;
                let labels = parse_labels(query.labels.as_deref())?;
                let namespace = query.namespace.as_deref().filter(|ns| !ns.trim().is_empty());
                let policies = p.find_policies(namespace, &labels).await?;
                json_response(StatusCode::OK, &policies)
            }

            Route::GetPolicy(name) => {
                let namespace = required_namespace(&req)?;
                let policy = p.get_policy(&namespace, &name).await?;
                json_response(StatusCode::OK, &policy)
            }

            Route::DeletePolicy(name) => {
                let namespace = required_namespace(&req)?;
                if !p.delete_policy(&namespace, &name).await? {
                    return Err(Error::PolicyNotFound { namespace, name });
                }
                json_response(StatusCode::OK, &DeleteResponse::one(name, namespace))
            }

            Route::ListPolicies(namespace) => {
                let policies = p.list_policies(&namespace).await?;
                json_response(StatusCode::OK, &policies)
            }

            Route::DeletePolicies(namespace) => {
                let count = p.delete_policies(&namespace).await?;
                json_response(StatusCode::OK, &DeleteResponse::all(namespace, count))
            }
        }
    }
}

impl<C, B> tower::Service<Request<B>> for ApiService<C>
where
    C: Cluster,
    B: hyper::body::Body + Send + 'static,
    B::Data: Send,
    B::Error: std::fmt::Display + Send,
{
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = future::BoxFuture<'static, Result<Response<Body>, Infallible>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let span = info_span!("request", method = %req.method(), path = %req.uri().path());
        let svc = self.clone();
        Box::pin(async move { Ok(svc.handle(req).await) }.instrument(span))
    }
}

fn created_or_ok(status: Status) -> StatusCode {
    if status.is_created() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    }
}

fn health(available: bool, up: &str, down: &str) -> Result<Response<Body>, Error> {
    if available {
        json_response(StatusCode::OK, &HealthResponse::new(HealthStatus::Up, up))
    } else {
        json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &HealthResponse::new(HealthStatus::Down, down),
        )
    }
}

fn info() -> serde_json::Value {
    serde_json::json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Provisions Kubernetes namespaces, service accounts and Cilium Network Policies",
        "endpoints": {
            "Namespaces": "/api/v1/namespaces",
            "Service Accounts": "/api/v1/serviceaccounts",
            "Cilium Network Policies": "/api/v1/cilium-network-policies",
        },
    })
}

async fn read_json<T, B>(req: Request<B>) -> Result<T, Error>
where
    T: DeserializeOwned,
    B: hyper::body::Body,
    B::Error: std::fmt::Display,
{
    let bytes = req
        .into_body()
        .collect()
        .await
        .map_err(|error| Error::BadRequest(format!("Failed to read request body: {error}")))?
        .to_bytes();
    serde_json::from_slice(&bytes).map_err(|error| ValidationError::new("body", error).into())
}

fn parse_query<B>(req: &Request<B>) -> Result<Query, Error> {
    serde_urlencoded::from_str(req.uri().query().unwrap_or_default())
        .map_err(|error| Error::BadRequest(format!("Invalid query string: {error}")))
}

fn required_namespace<B>(req: &Request<B>) -> Result<String, Error> {
    match parse_query(req)?.namespace {
        Some(ns) if !ns.trim().is_empty() => Ok(ns),
        _ => Err(ValidationError::new(
            "namespace",
            "Namespace query parameter cannot be blank",
        )
        .into()),
    }
}

/// Parses a `key=value,key2=value2` label filter.
fn parse_labels(param: Option<&str>) -> Result<Map, Error> {
    let param = param.map(str::trim).unwrap_or_default();
    if param.is_empty() {
        return Err(Error::BadRequest(
            "Invalid labels parameter: Labels parameter cannot be empty".to_string(),
        ));
    }

    param
        .split(',')
        .map(|pair| match pair.trim().split_once('=') {
            Some((k, v)) => Ok((k.trim().to_string(), v.trim().to_string())),
            None => Err(Error::BadRequest(
                "Invalid labels parameter: Invalid label format. Expected: key=value,key2=value2"
                    .to_string(),
            )),
        })
        .collect()
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Result<Response<Body>, Error> {
    let bytes = serde_json::to_vec(body)
        .map_err(|error| Error::Unexpected(format!("failed to encode json response: {error}")))?;
    Ok(Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(bytes))
        .expect("json response must be valid"))
}

fn error_response(status: StatusCode, body: &ErrorResponse) -> Response<Body> {
    let bytes = serde_json::to_vec(body).unwrap_or_default();
    Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(bytes))
        .expect("error response must be valid")
}
