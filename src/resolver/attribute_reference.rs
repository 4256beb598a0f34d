//! `attribute_reference` resolver.
//!
//! Matches resource addresses found inside attribute values to nodes by
//! type and name. Ambiguous short names resolve to the candidate in the
//! referrer's namespace, or not at all.

use super::ResourceIndex;
use crate::graph::{Edge, EdgeReason, ReferenceKind, ReferenceTarget};
use crate::normalizer::NormalizedSet;

pub fn resolve(set: &NormalizedSet) -> Vec<Edge> {
    let index = ResourceIndex::new(set);
    let mut edges = Vec::new();

    for resource in set.iter() {
        for reference in &resource.raw_references {
            if reference.kind != ReferenceKind::Attribute {
                continue;
            }
            let ReferenceTarget::Resource(address) = &reference.target else {
                continue;
            };
            for target in index.resolve(resource, address) {
                if target.id() != resource.id() {
                    edges.push(Edge::new(
                        resource.id(),
                        target.id(),
                        EdgeReason::AttributeReference,
                    ));
                }
            }
        }
    }

    edges
}
