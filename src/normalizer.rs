//! Resource normalizer.
//!
//! Assigns every descriptor its canonical node id and rejects distinct
//! descriptors that collide on the same id. Runs once, after all adapters
//! have finished, so conflict detection does not depend on the order in
//! which files were parsed.

use crate::error::IngestError;
use crate::graph::{Node, RawReference, ResourceDescriptor, ResourceHints, SourceKind};

/// Namespaced type tag, e.g. `tf.aws_instance` or `k8s.Deployment`.
pub fn node_type(source_kind: SourceKind, raw_type: &str) -> String {
    format!("{}.{}", source_kind.prefix(), raw_type)
}

/// Canonical node id: `<type>:<name>` or `<type>:<namespace>/<name>`.
///
/// A pure function of its inputs, so identical input always yields
/// identical ids.
pub fn node_id(
    source_kind: SourceKind,
    raw_type: &str,
    raw_name: &str,
    namespace: Option<&str>,
) -> String {
    let type_tag = node_type(source_kind, raw_type);
    match namespace {
        Some(ns) => format!("{}:{}/{}", type_tag, ns, raw_name),
        None => format!("{}:{}", type_tag, raw_name),
    }
}

/// A descriptor after identity assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResource {
    pub node: Node,
    pub source_kind: SourceKind,
    pub raw_type: String,
    pub raw_name: String,
    pub raw_references: Vec<RawReference>,
    pub hints: ResourceHints,
    pub origin: String,
}

impl NormalizedResource {
    pub fn id(&self) -> &str {
        &self.node.id
    }

    pub fn namespace(&self) -> Option<&str> {
        self.node.namespace.as_deref()
    }

    fn from_descriptor(descriptor: ResourceDescriptor) -> Self {
        let id = node_id(
            descriptor.source_kind,
            &descriptor.raw_type,
            &descriptor.raw_name,
            descriptor.namespace.as_deref(),
        );
        let node = Node {
            id,
            name: descriptor.raw_name.clone(),
            type_: node_type(descriptor.source_kind, &descriptor.raw_type),
            attributes: descriptor.attributes,
            namespace: descriptor.namespace,
        };
        Self {
            node,
            source_kind: descriptor.source_kind,
            raw_type: descriptor.raw_type,
            raw_name: descriptor.raw_name,
            raw_references: descriptor.raw_references,
            hints: descriptor.hints,
            origin: descriptor.origin,
        }
    }

    /// Same resource, possibly read from a different file.
    fn same_content(&self, other: &Self) -> bool {
        self.node == other.node
            && self.raw_references == other.raw_references
            && self.hints == other.hints
    }
}

/// The flat, id-ordered resource set every resolver consumes.
#[derive(Debug, Clone, Default)]
pub struct NormalizedSet {
    resources: Vec<NormalizedResource>,
}

impl NormalizedSet {
    pub fn resources(&self) -> &[NormalizedResource] {
        &self.resources
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NormalizedResource> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&NormalizedResource> {
        self.resources
            .binary_search_by(|r| r.id().cmp(id))
            .ok()
            .map(|i| &self.resources[i])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.resources.iter().map(|r| &r.node)
    }
}

/// Assign ids to every descriptor of one ingestion and detect conflicts.
///
/// Byte-identical duplicates (the same manifest uploaded twice) collapse into
/// one resource; differing descriptors with the same id fail with
/// [`IngestError::Conflict`].
pub fn normalize(descriptors: Vec<ResourceDescriptor>) -> Result<NormalizedSet, IngestError> {
    let mut resources: Vec<NormalizedResource> = descriptors
        .into_iter()
        .map(NormalizedResource::from_descriptor)
        .collect();
    resources.sort_by(|a, b| a.id().cmp(b.id()).then_with(|| a.origin.cmp(&b.origin)));

    let mut merged: Vec<NormalizedResource> = Vec::with_capacity(resources.len());
    for resource in resources {
        if let Some(previous) = merged.last() {
            if previous.id() == resource.id() {
                if previous.same_content(&resource) {
                    log::debug!(
                        "Collapsing duplicate {} from {} and {}",
                        resource.id(),
                        previous.origin,
                        resource.origin
                    );
                    continue;
                }
                return Err(IngestError::Conflict {
                    id: resource.node.id.clone(),
                    first: previous.origin.clone(),
                    second: resource.origin.clone(),
                });
            }
        }
        merged.push(resource);
    }

    log::debug!("Normalized {} resources", merged.len());
    Ok(NormalizedSet { resources: merged })
}
