//! Adapter output records, before node identities are assigned.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// The input format a resource was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Terraform,
    Kubernetes,
    Helm,
}

impl SourceKind {
    /// Short prefix used in node type tags (`tf.aws_vpc`, `k8s.Service`).
    pub fn prefix(&self) -> &'static str {
        match self {
            SourceKind::Terraform => "tf",
            SourceKind::Kubernetes => "k8s",
            SourceKind::Helm => "helm",
        }
    }

    /// Whether resources of this kind follow Kubernetes object semantics.
    pub fn is_kubernetes_family(&self) -> bool {
        matches!(self, SourceKind::Kubernetes | SourceKind::Helm)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Terraform => write!(f, "terraform"),
            SourceKind::Kubernetes => write!(f, "kubernetes"),
            SourceKind::Helm => write!(f, "helm"),
        }
    }
}

/// Which resolver a raw reference is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReferenceKind {
    /// Declared ordering (`depends_on`, chart membership).
    Explicit,
    /// Resource address found inside an attribute value.
    Attribute,
}

/// A type+name address that may point at another resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceAddress {
    pub raw_type: String,
    pub name: String,
    /// Set when the reference pins a namespace (or Terraform module path).
    pub namespace: Option<String>,
}

impl ResourceAddress {
    pub fn new(raw_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            raw_type: raw_type.into(),
            name: name.into(),
            namespace: None,
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}.{}", ns, self.raw_type, self.name),
            None => write!(f, "{}.{}", self.raw_type, self.name),
        }
    }
}

/// Target of a raw reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReferenceTarget {
    /// A single resource by type and name.
    Resource(ResourceAddress),
    /// Every resource inside a Terraform module (`module.network`).
    Module(String),
    /// A synthetic chart or dependency node; only Helm resources match.
    Helm(ResourceAddress),
}

/// Free-text reference found by an adapter, tagged for one resolver.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawReference {
    pub kind: ReferenceKind,
    /// The text as it appeared in the input.
    pub text: String,
    pub target: ReferenceTarget,
}

impl RawReference {
    pub fn explicit(text: impl Into<String>, target: ResourceAddress) -> Self {
        Self {
            kind: ReferenceKind::Explicit,
            text: text.into(),
            target: ReferenceTarget::Resource(target),
        }
    }

    /// Membership of a rendered resource in its chart, or of a chart's dependency.
    pub fn helm_membership(text: impl Into<String>, target: ResourceAddress) -> Self {
        Self {
            kind: ReferenceKind::Explicit,
            text: text.into(),
            target: ReferenceTarget::Helm(target),
        }
    }

    pub fn explicit_module(text: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            kind: ReferenceKind::Explicit,
            text: text.into(),
            target: ReferenceTarget::Module(module.into()),
        }
    }

    pub fn attribute(text: impl Into<String>, target: ResourceAddress) -> Self {
        Self {
            kind: ReferenceKind::Attribute,
            text: text.into(),
            target: ReferenceTarget::Resource(target),
        }
    }
}

/// Backend service named by an Ingress rule.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IngressBackendRef {
    pub service: String,
    /// Port number or port name, as written.
    pub port: Option<String>,
}

/// Kind of configuration object a workload consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigKind {
    ConfigMap,
    Secret,
}

impl ConfigKind {
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigKind::ConfigMap => "ConfigMap",
            ConfigKind::Secret => "Secret",
        }
    }
}

/// A ConfigMap or Secret consumed by a workload.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigRef {
    pub kind: ConfigKind,
    pub name: String,
}

/// Schema-aware relationship hints only the Kubernetes adapter can extract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceHints {
    /// Label selector this resource uses to pick pods.
    pub selector: Option<BTreeMap<String, String>>,
    /// Labels carried by the pods this resource creates (or by the pod itself).
    pub pod_labels: Option<BTreeMap<String, String>>,
    pub ingress_backends: Vec<IngressBackendRef>,
    pub config_refs: Vec<ConfigRef>,
}

/// One resource as emitted by a format adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    pub source_kind: SourceKind,
    pub raw_type: String,
    pub raw_name: String,
    pub namespace: Option<String>,
    pub attributes: Map<String, Value>,
    pub raw_references: Vec<RawReference>,
    pub hints: ResourceHints,
    /// File the descriptor came from, for error messages.
    pub origin: String,
}

impl ResourceDescriptor {
    pub fn new(
        source_kind: SourceKind,
        raw_type: impl Into<String>,
        raw_name: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            source_kind,
            raw_type: raw_type.into(),
            raw_name: raw_name.into(),
            namespace: None,
            attributes: Map::new(),
            raw_references: Vec::new(),
            hints: ResourceHints::default(),
            origin: origin.into(),
        }
    }

    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn with_attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Descriptors and recoverable warnings produced by one adapter call.
#[derive(Debug, Clone, Default)]
pub struct AdapterOutput {
    pub descriptors: Vec<ResourceDescriptor>,
    pub warnings: Vec<String>,
}

impl AdapterOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn extend(&mut self, other: AdapterOutput) {
        self.descriptors.extend(other.descriptors);
        self.warnings.extend(other.warnings);
    }
}
