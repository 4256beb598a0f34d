//! `selector_match` resolver.
//!
//! A selector matches a label set when every selector pair is present and
//! equal. Matching never crosses namespaces.

use crate::graph::{Edge, EdgeReason};
use crate::normalizer::{NormalizedResource, NormalizedSet};
use std::collections::{BTreeMap, HashMap};

pub fn resolve(set: &NormalizedSet) -> Vec<Edge> {
    let mut labeled: HashMap<Option<&str>, Vec<(&NormalizedResource, &BTreeMap<String, String>)>> =
        HashMap::new();
    for resource in set.iter().filter(|r| r.source_kind.is_kubernetes_family()) {
        if let Some(labels) = &resource.hints.pod_labels {
            labeled
                .entry(resource.namespace())
                .or_default()
                .push((resource, labels));
        }
    }

    let mut edges = Vec::new();
    for resource in set.iter().filter(|r| r.source_kind.is_kubernetes_family()) {
        let Some(selector) = resource.hints.selector.as_ref().filter(|s| !s.is_empty()) else {
            continue;
        };
        let Some(candidates) = labeled.get(&resource.namespace()) else {
            continue;
        };
        for (target, labels) in candidates {
            if target.id() != resource.id() && selector_matches(selector, labels) {
                edges.push(Edge::new(resource.id(), target.id(), EdgeReason::SelectorMatch));
            }
        }
    }

    edges
}

/// True when every selector pair is present in `labels` with the same value.
pub fn selector_matches(selector: &BTreeMap<String, String>, labels: &BTreeMap<String, String>) -> bool {
    !selector.is_empty()
        && selector
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SourceKind;
    use crate::normalizer::normalize;
    use crate::resolver::test_support::{kube, labels};

    fn service(namespace: &str, selector: &[(&str, &str)]) -> crate::graph::ResourceDescriptor {
        let mut service = kube("Service", "web", namespace);
        service.hints.selector = Some(labels(selector));
        service
    }

    fn deployment(name: &str, namespace: &str, pod_labels: &[(&str, &str)]) -> crate::graph::ResourceDescriptor {
        let mut deployment = kube("Deployment", name, namespace);
        deployment.hints.pod_labels = Some(labels(pod_labels));
        deployment
    }

    #[test]
    fn test_selector_subset_of_labels() {
        assert!(selector_matches(
            &labels(&[("app", "web")]),
            &labels(&[("app", "web"), ("tier", "frontend")])
        ));
        assert!(!selector_matches(
            &labels(&[("app", "web"), ("tier", "backend")]),
            &labels(&[("app", "web"), ("tier", "frontend")])
        ));
        assert!(!selector_matches(&labels(&[]), &labels(&[("app", "web")])));
    }

    #[test]
    fn test_service_selects_deployment() {
        let set = normalize(vec![
            service("default", &[("app", "web")]),
            deployment("web", "default", &[("app", "web")]),
            deployment("api", "default", &[("app", "api")]),
        ])
        .unwrap();
        assert_eq!(
            resolve(&set),
            vec![Edge::new(
                "k8s.Service:default/web",
                "k8s.Deployment:default/web",
                EdgeReason::SelectorMatch
            )]
        );
    }

    #[test]
    fn test_never_crosses_namespaces() {
        let set = normalize(vec![
            service("default", &[("app", "web")]),
            deployment("web", "prod", &[("app", "web")]),
        ])
        .unwrap();
        assert!(resolve(&set).is_empty());
    }

    #[test]
    fn test_helm_and_kubernetes_sources_match() {
        let mut rendered = deployment("web", "default", &[("app", "web")]);
        rendered.source_kind = SourceKind::Helm;
        let set = normalize(vec![service("default", &[("app", "web")]), rendered]).unwrap();
        assert_eq!(resolve(&set)[0].to_id, "helm.Deployment:default/web");
    }
}
