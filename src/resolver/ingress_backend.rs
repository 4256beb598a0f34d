//! `ingress_backend` resolver: Ingress to the Services it routes to.

use super::ResourceIndex;
use crate::graph::{Edge, EdgeReason};
use crate::normalizer::NormalizedSet;

pub fn resolve(set: &NormalizedSet) -> Vec<Edge> {
    let index = ResourceIndex::new(set);
    let mut edges = Vec::new();

    for ingress in set.iter().filter(|r| r.source_kind.is_kubernetes_family()) {
        for backend in &ingress.hints.ingress_backends {
            let services = index.kube_objects("Service", &backend.service, ingress.namespace());
            if services.is_empty() {
                log::debug!(
                    "{}: backend service {} not in this graph",
                    ingress.id(),
                    backend.service
                );
            }
            for service in services {
                edges.push(Edge::new(ingress.id(), service.id(), EdgeReason::IngressBackend));
            }
        }
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::IngressBackendRef;
    use crate::normalizer::normalize;
    use crate::resolver::test_support::kube;

    fn ingress(namespace: &str, services: &[&str]) -> crate::graph::ResourceDescriptor {
        let mut ingress = kube("Ingress", "shop", namespace);
        ingress.hints.ingress_backends = services
            .iter()
            .map(|s| IngressBackendRef {
                service: s.to_string(),
                port: Some("80".to_string()),
            })
            .collect();
        ingress
    }

    #[test]
    fn test_backend_in_same_namespace() {
        let set = normalize(vec![
            ingress("prod", &["checkout"]),
            kube("Service", "checkout", "prod"),
            kube("Service", "checkout", "staging"),
            kube("Deployment", "checkout", "prod"),
        ])
        .unwrap();
        assert_eq!(
            resolve(&set),
            vec![Edge::new(
                "k8s.Ingress:prod/shop",
                "k8s.Service:prod/checkout",
                EdgeReason::IngressBackend
            )]
        );
    }

    #[test]
    fn test_missing_backend_is_dropped() {
        let set = normalize(vec![ingress("prod", &["checkout", "cart"])]).unwrap();
        assert!(resolve(&set).is_empty());
    }
}
