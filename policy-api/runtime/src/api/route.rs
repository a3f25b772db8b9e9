use http::Method;

const NAMESPACES: &[&str] = &["api", "v1", "namespaces"];
const SERVICE_ACCOUNTS: &[&str] = &["api", "v1", "serviceaccounts"];
const POLICIES: &[&str] = &["api", "v1", "cilium-network-policies"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Route {
    Info,
    Hello,
    CreateNamespace,
    NamespacesHealth,
    CreateServiceAccount,
    CreatePolicy,
    PoliciesHealth,
    FindPolicies,
    GetPolicy(String),
    DeletePolicy(String),
    ListPolicies(String),
    DeletePolicies(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Unrecognized {
    NotFound,
    /// The path is known but does not accept the request's method.
    MethodNotAllowed(&'static str),
}

// === impl Route ===

impl Route {
    pub(crate) fn recognize(method: &Method, path: &str) -> Result<Self, Unrecognized> {
        let segments = path.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>();

        if let Some(rest) = segments.strip_prefix(POLICIES) {
            return match rest {
                [] => only(method, Method::POST, "policies", Route::CreatePolicy),
                ["health"] => only(method, Method::GET, "policies_health", Route::PoliciesHealth),
                ["endpoint-selector"] => {
                    only(method, Method::GET, "policies_endpoint_selector", Route::FindPolicies)
                }
                ["namespace", ns] => match *method {
                    Method::GET => Ok(Route::ListPolicies(ns.to_string())),
                    Method::DELETE => Ok(Route::DeletePolicies(ns.to_string())),
                    _ => Err(Unrecognized::MethodNotAllowed("policies_namespace")),
                },
                [name] => match *method {
                    Method::GET => Ok(Route::GetPolicy(name.to_string())),
                    Method::DELETE => Ok(Route::DeletePolicy(name.to_string())),
                    _ => Err(Unrecognized::MethodNotAllowed("policy")),
                },
                _ => Err(Unrecognized::NotFound),
            };
        }

        if let Some(rest) = segments.strip_prefix(NAMESPACES) {
            return match rest {
                [] => only(method, Method::POST, "namespaces", Route::CreateNamespace),
                ["health"] => {
                    only(method, Method::GET, "namespaces_health", Route::NamespacesHealth)
                }
                _ => Err(Unrecognized::NotFound),
            };
        }

        match segments.as_slice() {
            [] => only(method, Method::GET, "info", Route::Info),
            ["hello"] => only(method, Method::GET, "hello", Route::Hello),
            s if s == SERVICE_ACCOUNTS => only(
                method,
                Method::POST,
                "serviceaccounts",
                Route::CreateServiceAccount,
            ),
            _ => Err(Unrecognized::NotFound),
        }
    }

    /// A low-cardinality name for the route, used to label metrics.
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Hello => "hello",
            Self::CreateNamespace => "namespaces",
            Self::NamespacesHealth => "namespaces_health",
            Self::CreateServiceAccount => "serviceaccounts",
            Self::CreatePolicy => "policies",
            Self::PoliciesHealth => "policies_health",
            Self::FindPolicies => "policies_endpoint_selector",
            Self::GetPolicy(_) | Self::DeletePolicy(_) => "policy",
            Self::ListPolicies(_) | Self::DeletePolicies(_) => "policies_namespace",
        }
    }
}

fn only(
    method: &Method,
    allowed: Method,
    name: &'static str,
    route: Route,
) -> Result<Route, Unrecognized> {
    if *method == allowed {
        Ok(route)
    } else {
        Err(Unrecognized::MethodNotAllowed(name))
    }
}

// === impl Unrecognized ===

impl Unrecognized {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::NotFound => "unknown",
            Self::MethodNotAllowed(name) => *name,
        }
    }
}
