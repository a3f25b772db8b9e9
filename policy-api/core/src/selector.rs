use crate::Map;
use cilium_policy_api_k8s_api::{policy::spec_of, DynamicObject};

/// Returns true if the policy's endpoint selector contains every label in
/// `target`.
///
/// Policies whose spec is missing or unreadable, or that have no endpoint
/// selector, never match. A `matchLabels` value that is not a string makes the
/// spec unreadable; the Cilium CRD schema only admits string values.
pub fn matches(obj: &DynamicObject, target: &Map) -> bool {
    match spec_of(obj) {
        Ok(Some(spec)) => spec
            .endpoint_selector
            .is_some_and(|selector| selector.contains_labels(target)),
        Ok(None) | Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cilium_policy_api_k8s_api::CiliumNetworkPolicy;
    use maplit::{btreemap, convert_args};
    use serde_json::json;

    fn policy(spec: serde_json::Value) -> DynamicObject {
        let mut obj = DynamicObject::new("web", &CiliumNetworkPolicy::api_resource());
        obj.data = json!({ "spec": spec });
        obj
    }

    #[test]
    fn containment() {
        let obj = policy(json!({
            "endpointSelector": { "matchLabels": { "app": "web", "tier": "frontend" } },
        }));

        for (target, expected) in [
            (Map::new(), true),
            (convert_args!(btreemap!("app" => "web")), true),
            (convert_args!(btreemap!("app" => "web", "tier" => "frontend")), true),
            (convert_args!(btreemap!("app" => "api")), false),
            (convert_args!(btreemap!("env" => "prod")), false),
            (
                convert_args!(btreemap!("app" => "web", "tier" => "frontend", "env" => "prod")),
                false,
            ),
        ] {
            assert_eq!(matches(&obj, &target), expected, "{target:?}");
        }
    }

    #[test]
    fn empty_selector_matches_only_empty_target() {
        let app = convert_args!(btreemap!("app" => "web"));
        for spec in [
            json!({ "endpointSelector": {} }),
            json!({ "endpointSelector": { "matchLabels": {} } }),
        ] {
            let obj = policy(spec);
            assert!(matches(&obj, &Map::new()));
            assert!(!matches(&obj, &app));
        }
    }

    #[test]
    fn malformed_policies_never_match() {
        let mut no_spec = DynamicObject::new("web", &CiliumNetworkPolicy::api_resource());
        assert!(!matches(&no_spec, &Map::new()));

        no_spec.data = json!({ "spec": {} });
        assert!(!matches(&no_spec, &Map::new()), "no endpoint selector");

        let malformed = policy(json!({ "endpointSelector": { "matchLabels": ["app"] } }));
        assert!(!matches(&malformed, &Map::new()));

        let numeric = policy(json!({ "endpointSelector": { "matchLabels": { "port": 80 } } }));
        assert!(!matches(&numeric, &convert_args!(btreemap!("port" => "80"))));
    }
}
