//! `depends_on` resolver: declared ordering and chart membership.

use super::ResourceIndex;
use crate::graph::{Edge, EdgeReason, ReferenceKind, ReferenceTarget};
use crate::normalizer::NormalizedSet;

pub fn resolve(set: &NormalizedSet) -> Vec<Edge> {
    let index = ResourceIndex::new(set);
    let mut edges = Vec::new();

    for resource in set.iter() {
        let explicit = resource
            .raw_references
            .iter()
            .filter(|r| r.kind == ReferenceKind::Explicit);
        for reference in explicit {
            let targets = match &reference.target {
                ReferenceTarget::Resource(address) => index.resolve(resource, address),
                ReferenceTarget::Module(module) => index.module_members(module),
                ReferenceTarget::Helm(address) => index.helm_nodes(address),
            };
            if targets.is_empty() {
                // Partial views are normal; the target may live elsewhere.
                log::debug!(
                    "{}: dependency {} not in this graph",
                    resource.id(),
                    reference.text
                );
            }
            for target in targets.into_iter().filter(|t| t.id() != resource.id()) {
                edges.push(Edge::new(resource.id(), target.id(), EdgeReason::DependsOn));
            }
        }
    }

    edges
}
