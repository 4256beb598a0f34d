//! `config_reference` resolver: workloads to the ConfigMaps and Secrets they
//! consume through env, envFrom or volumes.

use super::ResourceIndex;
use crate::graph::{Edge, EdgeReason};
use crate::normalizer::NormalizedSet;

pub fn resolve(set: &NormalizedSet) -> Vec<Edge> {
    let index = ResourceIndex::new(set);
    let mut edges = Vec::new();

    for workload in set.iter().filter(|r| r.source_kind.is_kubernetes_family()) {
        for config in &workload.hints.config_refs {
            for target in index.kube_objects(config.kind.kind(), &config.name, workload.namespace()) {
                edges.push(Edge::new(workload.id(), target.id(), EdgeReason::ConfigReference));
            }
        }
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ConfigKind, ConfigRef};
    use crate::normalizer::normalize;
    use crate::resolver::test_support::kube;

    #[test]
    fn test_workload_to_config() {
        let mut deployment = kube("Deployment", "api", "prod");
        deployment.hints.config_refs = vec![
            ConfigRef {
                kind: ConfigKind::ConfigMap,
                name: "api-config".to_string(),
            },
            ConfigRef {
                kind: ConfigKind::Secret,
                name: "api-token".to_string(),
            },
            ConfigRef {
                kind: ConfigKind::Secret,
                name: "not-uploaded".to_string(),
            },
        ];
        let set = normalize(vec![
            deployment,
            kube("ConfigMap", "api-config", "prod"),
            kube("Secret", "api-token", "prod"),
            kube("ConfigMap", "api-token", "prod"),
            kube("Secret", "api-token", "dev"),
        ])
        .unwrap();

        let targets: Vec<_> = resolve(&set).into_iter().map(|e| e.to_id).collect();
        assert_eq!(
            targets,
            vec!["k8s.ConfigMap:prod/api-config", "k8s.Secret:prod/api-token"]
        );
    }
}
