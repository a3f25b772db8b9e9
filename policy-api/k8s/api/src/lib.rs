#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod labels;
pub mod policy;

pub use self::{
    labels::{Map, Selector},
    policy::{CiliumNetworkPolicy, CiliumNetworkPolicySpec},
};
pub use k8s_openapi::{
    api::core::v1::{Namespace, ServiceAccount},
    apimachinery::pkg::apis::meta::v1::Time,
};
pub use kube::{
    api::{Api, ApiResource, DynamicObject, ObjectMeta, ResourceExt},
    Client, Error, Resource,
};
