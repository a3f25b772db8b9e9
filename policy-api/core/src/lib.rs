#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod name;
pub mod request;
pub mod response;
mod selector;
pub mod translate;
pub mod validation;

pub use self::{
    name::generate_name,
    request::{NamespaceRequest, PolicyRequest, ServiceAccountRequest},
    response::{
        DeleteResponse, HealthResponse, HealthStatus, NamespaceResponse, PolicyResponse,
        ServiceAccountResponse, Status,
    },
    selector::matches,
    validation::{Validate, ValidationError, Violation},
};
pub use cilium_policy_api_k8s_api::{labels::Map, policy::POD_NAMESPACE_LABEL};
