//! Lookup tables over a [`NormalizedSet`].

use crate::graph::{ResourceAddress, SourceKind};
use crate::normalizer::{NormalizedResource, NormalizedSet};
use std::collections::HashMap;

/// Type+name lookup used by every resolver.
pub struct ResourceIndex<'a> {
    /// raw type -> raw name -> resources
    by_type: HashMap<&'a str, HashMap<&'a str, Vec<&'a NormalizedResource>>>,
    all: &'a [NormalizedResource],
}

impl<'a> ResourceIndex<'a> {
    pub fn new(set: &'a NormalizedSet) -> Self {
        let mut by_type: HashMap<&str, HashMap<&str, Vec<_>>> = HashMap::new();
        for resource in set.iter() {
            by_type
                .entry(resource.raw_type.as_str())
                .or_default()
                .entry(resource.raw_name.as_str())
                .or_default()
                .push(resource);
        }
        Self {
            by_type,
            all: set.resources(),
        }
    }

    fn named(&self, raw_type: &str, name: &str) -> &[&'a NormalizedResource] {
        self.by_type
            .get(raw_type)
            .and_then(|names| names.get(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Resolve an address as seen from `referrer`.
    ///
    /// A single exact match wins. Among several, the one sharing the
    /// referrer's namespace wins; otherwise the reference is ambiguous and
    /// nothing is returned. An unindexed name (`aws_instance.web`) that only
    /// exists as counted instances (`web[0]`, `web[1]`) resolves to all of
    /// them, under the same namespace preference.
    pub fn resolve(
        &self,
        referrer: &NormalizedResource,
        address: &ResourceAddress,
    ) -> Vec<&'a NormalizedResource> {
        let pinned = |r: &&NormalizedResource| match &address.namespace {
            Some(ns) => r.namespace() == Some(ns.as_str()),
            None => true,
        };

        let exact: Vec<_> = self
            .named(&address.raw_type, &address.name)
            .iter()
            .copied()
            .filter(pinned)
            .collect();
        if !exact.is_empty() {
            return match exact.len() {
                1 => exact,
                _ => {
                    let local = same_namespace(referrer, &exact);
                    if local.len() == 1 {
                        local
                    } else {
                        log::debug!(
                            "{}: ambiguous reference {} ({} candidates)",
                            referrer.id(),
                            address,
                            exact.len()
                        );
                        Vec::new()
                    }
                }
            };
        }

        if address.name.contains('[') {
            return Vec::new();
        }
        let prefix = format!("{}[", address.name);
        let mut instances: Vec<_> = self
            .by_type
            .get(address.raw_type.as_str())
            .into_iter()
            .flat_map(|names| names.iter())
            .filter(|(name, _)| name.starts_with(&prefix))
            .flat_map(|(_, resources)| resources.iter().copied())
            .filter(pinned)
            .collect();
        instances.sort_by(|a, b| a.id().cmp(b.id()));
        if instances.is_empty() {
            return instances;
        }

        let local = same_namespace(referrer, &instances);
        if !local.is_empty() {
            return local;
        }
        let first_ns = instances[0].namespace();
        if instances.iter().all(|r| r.namespace() == first_ns) {
            instances
        } else {
            Vec::new()
        }
    }

    /// Every Terraform resource inside `module` or one of its child modules.
    pub fn module_members(&self, module: &str) -> Vec<&'a NormalizedResource> {
        let nested = format!("{}.", module);
        self.all
            .iter()
            .filter(|r| r.source_kind == SourceKind::Terraform)
            .filter(|r| match r.namespace() {
                Some(ns) => ns == module || ns.starts_with(&nested),
                None => false,
            })
            .collect()
    }

    /// Synthetic Helm nodes (`Chart`, `Dependency`) by type and name.
    pub fn helm_nodes(&self, address: &ResourceAddress) -> Vec<&'a NormalizedResource> {
        self.named(&address.raw_type, &address.name)
            .iter()
            .copied()
            .filter(|r| r.source_kind == SourceKind::Helm && r.namespace().is_none())
            .collect()
    }

    /// Kubernetes-family objects of `kind` named `name` in `namespace`.
    ///
    /// Hand-written and Helm-rendered objects share namespaces, so both
    /// sources are searched.
    pub fn kube_objects(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
    ) -> Vec<&'a NormalizedResource> {
        self.named(kind, name)
            .iter()
            .copied()
            .filter(|r| r.source_kind.is_kubernetes_family() && r.namespace() == namespace)
            .collect()
    }
}

fn same_namespace<'a>(
    referrer: &NormalizedResource,
    candidates: &[&'a NormalizedResource],
) -> Vec<&'a NormalizedResource> {
    candidates
        .iter()
        .copied()
        .filter(|r| r.namespace() == referrer.namespace())
        .collect()
}
