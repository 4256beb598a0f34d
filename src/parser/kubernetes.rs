//! Kubernetes manifest adapter.
//!
//! A file may hold several `---` separated documents. Each resource document
//! becomes one descriptor; `List` kinds are flattened into their items.
//! Selector, pod label, ingress backend and config hints are extracted here
//! because they need per-kind schema knowledge.

use crate::error::IngestError;
use crate::graph::{
    AdapterOutput, ConfigKind, ConfigRef, IngressBackendRef, ResourceDescriptor, ResourceHints,
    SourceKind,
};
use serde_json::{Map, Value as JsonValue};
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Namespace assigned to namespaced objects that do not declare one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Kinds that live outside any namespace.
const CLUSTER_SCOPED_KINDS: &[&str] = &[
    "Namespace",
    "Node",
    "PersistentVolume",
    "StorageClass",
    "ClusterRole",
    "ClusterRoleBinding",
    "CustomResourceDefinition",
    "PriorityClass",
    "IngressClass",
    "RuntimeClass",
    "MutatingWebhookConfiguration",
    "ValidatingWebhookConfiguration",
    "APIService",
    "CSIDriver",
    "VolumeAttachment",
];

/// Kinds whose pods are described by `spec.template`.
const TEMPLATED_WORKLOADS: &[&str] = &[
    "Deployment",
    "StatefulSet",
    "DaemonSet",
    "ReplicaSet",
    "ReplicationController",
    "Job",
];

/// How descriptors produced from a manifest set are tagged.
#[derive(Debug, Clone)]
pub struct ManifestOptions {
    pub source_kind: SourceKind,
    pub default_namespace: String,
}

impl Default for ManifestOptions {
    fn default() -> Self {
        Self {
            source_kind: SourceKind::Kubernetes,
            default_namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl ManifestOptions {
    pub fn helm(namespace: impl Into<String>) -> Self {
        Self {
            source_kind: SourceKind::Helm,
            default_namespace: namespace.into(),
        }
    }
}

/// Parse a YAML string containing one or more Kubernetes manifests.
pub fn parse_manifests(
    content: &str,
    origin: &str,
    options: &ManifestOptions,
) -> Result<AdapterOutput, IngestError> {
    let mut output = AdapterOutput::new();
    let mut line_number = 1u32;

    // Split on document separator and track line numbers
    for doc in content.split("\n---") {
        let doc_lines = doc.lines().count() as u32;
        let body = strip_separator(doc);

        if !is_comment_only(body) {
            let value: Value = serde_yaml::from_str(body).map_err(|e| {
                IngestError::parse(origin, format!("YAML syntax error at line {}: {}", line_number, e))
            })?;
            collect_document(&value, origin, line_number, options, &mut output);
        }

        line_number += doc_lines.max(1);
    }

    log::debug!(
        "Parsed {} Kubernetes resources from {}",
        output.descriptors.len(),
        origin
    );
    Ok(output)
}

/// The first document may still begin with its own `---` marker.
fn strip_separator(doc: &str) -> &str {
    let trimmed = doc.trim_start();
    match trimmed.strip_prefix("---") {
        Some(rest) => rest,
        None => doc,
    }
}

fn is_comment_only(doc: &str) -> bool {
    doc.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#'))
}

fn collect_document(
    value: &Value,
    origin: &str,
    line: u32,
    options: &ManifestOptions,
    output: &mut AdapterOutput,
) {
    match value {
        Value::Null => {}
        Value::Mapping(_) => {
            let kind = get_string(value, "kind");
            if let (Some(kind), Some(items)) = (
                kind.as_deref(),
                value.get("items").and_then(|i| i.as_sequence()),
            ) {
                if kind.ends_with("List") {
                    for item in items {
                        collect_document(item, origin, line, options, output);
                    }
                    return;
                }
            }
            match parse_object(value, origin, options) {
                Some(descriptor) => output.descriptors.push(descriptor),
                None => output.warn(format!(
                    "{}:{}: skipping document without kind or metadata.name",
                    origin, line
                )),
            }
        }
        _ => output.warn(format!(
            "{}:{}: skipping document that is not a mapping",
            origin, line
        )),
    }
}

/// Parse a single K8s object from a YAML value.
fn parse_object(
    value: &Value,
    origin: &str,
    options: &ManifestOptions,
) -> Option<ResourceDescriptor> {
    let kind = get_string(value, "kind")?;
    let metadata = value.get("metadata")?;
    let name = get_string(metadata, "name").filter(|n| !n.is_empty())?;

    let namespace = if CLUSTER_SCOPED_KINDS.contains(&kind.as_str()) {
        None
    } else {
        Some(
            get_string(metadata, "namespace")
                .filter(|ns| !ns.is_empty())
                .unwrap_or_else(|| options.default_namespace.clone()),
        )
    };

    let attributes = match yaml_to_json(value) {
        JsonValue::Object(map) => map,
        _ => Map::new(),
    };

    let mut descriptor = ResourceDescriptor::new(options.source_kind, &kind, name, origin)
        .with_namespace(namespace)
        .with_attributes(attributes);
    descriptor.hints = extract_hints(&kind, value);
    Some(descriptor)
}

// ============================================================================
// Relationship hints
// ============================================================================

fn extract_hints(kind: &str, value: &Value) -> ResourceHints {
    let spec = value.get("spec");

    let selector = match kind {
        "Service" => spec.and_then(|s| get_string_map(s, "selector")),
        "PodDisruptionBudget" => spec
            .and_then(|s| s.get("selector"))
            .and_then(|s| get_string_map(s, "matchLabels")),
        "NetworkPolicy" => spec
            .and_then(|s| s.get("podSelector"))
            .and_then(|s| get_string_map(s, "matchLabels")),
        _ => None,
    };

    let pod_labels = match kind {
        "Pod" => value
            .get("metadata")
            .and_then(|m| get_string_map(m, "labels")),
        _ => pod_template(kind, value)
            .and_then(|t| t.get("metadata"))
            .and_then(|m| get_string_map(m, "labels")),
    };

    let ingress_backends = if kind == "Ingress" {
        parse_ingress_backends(spec)
    } else {
        Vec::new()
    };

    let pod_spec = match kind {
        "Pod" => spec,
        _ => pod_template(kind, value).and_then(|t| t.get("spec")),
    };
    let config_refs = pod_spec.map(parse_config_refs).unwrap_or_default();

    ResourceHints {
        selector,
        pod_labels,
        ingress_backends,
        config_refs,
    }
}

fn pod_template<'a>(kind: &str, value: &'a Value) -> Option<&'a Value> {
    let spec = value.get("spec")?;
    if TEMPLATED_WORKLOADS.contains(&kind) {
        spec.get("template")
    } else if kind == "CronJob" {
        spec.get("jobTemplate")?.get("spec")?.get("template")
    } else {
        None
    }
}

fn parse_ingress_backends(spec: Option<&Value>) -> Vec<IngressBackendRef> {
    let Some(spec) = spec else {
        return Vec::new();
    };

    let mut backends = BTreeSet::new();
    for key in ["defaultBackend", "backend"] {
        if let Some(backend) = spec.get(key).and_then(parse_backend) {
            backends.insert(backend);
        }
    }

    let paths = spec
        .get("rules")
        .and_then(|r| r.as_sequence())
        .into_iter()
        .flatten()
        .filter_map(|rule| rule.get("http")?.get("paths")?.as_sequence())
        .flatten();
    for path in paths {
        if let Some(backend) = path.get("backend").and_then(parse_backend) {
            backends.insert(backend);
        }
    }

    backends.into_iter().collect()
}

/// Handles both `networking.k8s.io/v1` and the older `extensions/v1beta1` shape.
fn parse_backend(backend: &Value) -> Option<IngressBackendRef> {
    if let Some(service) = backend.get("service") {
        let name = get_string(service, "name")?;
        let port = service.get("port").and_then(|p| {
            get_scalar_string(p, "number").or_else(|| get_string(p, "name"))
        });
        return Some(IngressBackendRef {
            service: name,
            port,
        });
    }

    let name = get_string(backend, "serviceName")?;
    Some(IngressBackendRef {
        service: name,
        port: get_scalar_string(backend, "servicePort"),
    })
}

fn parse_config_refs(pod_spec: &Value) -> Vec<ConfigRef> {
    let mut refs = BTreeSet::new();

    let containers = ["containers", "initContainers"]
        .into_iter()
        .filter_map(|key| pod_spec.get(key)?.as_sequence())
        .flatten();
    for container in containers {
        for env_from in sequence(container.get("envFrom")) {
            push_named(&mut refs, ConfigKind::ConfigMap, env_from.get("configMapRef"), "name");
            push_named(&mut refs, ConfigKind::Secret, env_from.get("secretRef"), "name");
        }
        for env in sequence(container.get("env")) {
            let value_from = env.get("valueFrom");
            push_named(
                &mut refs,
                ConfigKind::ConfigMap,
                value_from.and_then(|v| v.get("configMapKeyRef")),
                "name",
            );
            push_named(
                &mut refs,
                ConfigKind::Secret,
                value_from.and_then(|v| v.get("secretKeyRef")),
                "name",
            );
        }
    }

    for volume in sequence(pod_spec.get("volumes")) {
        push_named(&mut refs, ConfigKind::ConfigMap, volume.get("configMap"), "name");
        push_named(&mut refs, ConfigKind::Secret, volume.get("secret"), "secretName");
        let sources = volume.get("projected").and_then(|p| p.get("sources"));
        for source in sequence(sources) {
            push_named(&mut refs, ConfigKind::ConfigMap, source.get("configMap"), "name");
            push_named(&mut refs, ConfigKind::Secret, source.get("secret"), "name");
        }
    }

    refs.into_iter().collect()
}

fn push_named(refs: &mut BTreeSet<ConfigRef>, kind: ConfigKind, value: Option<&Value>, key: &str) {
    if let Some(name) = value.and_then(|v| get_string(v, key)) {
        refs.insert(ConfigRef { kind, name });
    }
}

// ============================================================================
// Parse helper functions
// ============================================================================

fn get_string(value: &Value, key: &str) -> Option<String> {
    value.get(key)?.as_str().map(|s| s.to_string())
}

/// Ports may be written as numbers or names.
fn get_scalar_string(value: &Value, key: &str) -> Option<String> {
    scalar_string(value.get(key)?)
}

/// Unquoted YAML scalars (`version: 2`, `canary: true`) are label values too.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Tagged(tagged) => scalar_string(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// A label map with every pair intact, or `None`. A map holding a pair that
/// cannot be read as a string is rejected whole, so a selector never matches
/// more broadly than written.
fn get_string_map(value: &Value, key: &str) -> Option<BTreeMap<String, String>> {
    let mapping = value.get(key)?.as_mapping()?;
    let mut map = BTreeMap::new();
    for (k, v) in mapping {
        match (scalar_string(k), scalar_string(v)) {
            (Some(key), Some(val)) => {
                map.insert(key, val);
            }
            _ => {
                log::debug!("ignoring `{}`: non-scalar entry", key);
                return None;
            }
        }
    }
    if map.is_empty() { None } else { Some(map) }
}

fn sequence(value: Option<&Value>) -> impl Iterator<Item = &Value> {
    value.and_then(|v| v.as_sequence()).into_iter().flatten()
}

/// Convert a YAML value into JSON, stringifying non-string mapping keys.
pub fn yaml_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                JsonValue::from(i)
            } else if let Some(u) = n.as_u64() {
                JsonValue::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(JsonValue::Number)
                    .unwrap_or(JsonValue::Null)
            }
        }
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Sequence(items) => JsonValue::Array(items.iter().map(yaml_to_json).collect()),
        Value::Mapping(mapping) => {
            let mut map = Map::new();
            for (k, v) in mapping {
                map.insert(key_to_string(k), yaml_to_json(v));
            }
            JsonValue::Object(map)
        }
        Value::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

fn key_to_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}
