//! Relationship inference.
//!
//! Each resolver is a pure function from the normalized resource set to the
//! edges it discovers, and owns exactly one [`EdgeReason`]. Resolvers share no
//! state, so [`run_all`] executes them in parallel; the assembler dedups and
//! sorts their combined output.

pub mod attribute_reference;
pub mod config_reference;
pub mod depends_on;
pub mod index;
pub mod ingress_backend;
pub mod selector_match;

pub use index::ResourceIndex;

use crate::graph::{Edge, EdgeReason};
use crate::normalizer::NormalizedSet;
use rayon::prelude::*;

/// A relationship inference strategy.
pub type Resolver = fn(&NormalizedSet) -> Vec<Edge>;

/// Every resolver, with the reason tag it emits.
pub const RESOLVERS: &[(EdgeReason, Resolver)] = &[
    (EdgeReason::DependsOn, depends_on::resolve),
    (EdgeReason::AttributeReference, attribute_reference::resolve),
    (EdgeReason::SelectorMatch, selector_match::resolve),
    (EdgeReason::IngressBackend, ingress_backend::resolve),
    (EdgeReason::ConfigReference, config_reference::resolve),
];

/// Run all resolvers concurrently and concatenate their edges.
pub fn run_all(set: &NormalizedSet) -> Vec<Edge> {
    let per_resolver: Vec<Vec<Edge>> = RESOLVERS
        .par_iter()
        .map(|(reason, resolver)| {
            let edges = resolver(set);
            log::debug!("{} resolver found {} edges", reason, edges.len());
            edges
        })
        .collect();
    per_resolver.into_iter().flatten().collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::normalizer::normalize;

    #[test]
    fn test_each_resolver_emits_only_its_reason() {
        let mut service = kube("Service", "web", "default");
        service.hints.selector = Some(labels(&[("app", "web")]));
        let mut deployment = kube("Deployment", "web", "default");
        deployment.hints.pod_labels = Some(labels(&[("app", "web")]));

        let set = normalize(vec![service, deployment]).unwrap();
        for (reason, resolver) in RESOLVERS {
            assert!(resolver(&set).iter().all(|e| e.reason == *reason));
        }
        let edges = run_all(&set);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].reason, EdgeReason::SelectorMatch);
    }

    #[test]
    fn test_empty_set() {
        assert!(run_all(&NormalizedSet::default()).is_empty());
    }
}
