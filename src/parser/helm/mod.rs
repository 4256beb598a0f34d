//! Helm chart adapter.
//!
//! A packaged chart is extracted, rendered through a [`ChartRenderer`] and the
//! rendered manifests are handed to the Kubernetes adapter with
//! [`SourceKind::Helm`]. A synthetic `Chart` node and one `Dependency` node per
//! declared dependency make chart membership visible in the graph.

pub mod archive;
pub mod chart;
pub mod render;

pub use archive::{ArchiveLimits, ExtractedChart, extract_chart};
pub use chart::{ChartMetadata, Dependency, load_chart_metadata, parse_chart_yaml};
pub use render::{ChartRenderer, HelmCliRenderer, PrerenderedManifests, RenderError, RenderRequest};

use crate::error::IngestError;
use crate::graph::{AdapterOutput, RawReference, ResourceAddress, ResourceDescriptor, SourceKind};
use crate::parser::InputFile;
use crate::parser::kubernetes::{self, ManifestOptions};
use serde_json::{Map, Value};

pub const CHART_TYPE: &str = "Chart";
pub const DEPENDENCY_TYPE: &str = "Dependency";
pub const DEFAULT_RELEASE_NAME: &str = "release-name";

/// Per-chart rendering options.
#[derive(Debug, Clone)]
pub struct HelmOptions {
    pub namespace: String,
    pub release: String,
    pub limits: ArchiveLimits,
}

impl Default for HelmOptions {
    fn default() -> Self {
        Self {
            namespace: kubernetes::DEFAULT_NAMESPACE.to_string(),
            release: DEFAULT_RELEASE_NAME.to_string(),
            limits: ArchiveLimits::default(),
        }
    }
}

/// Parse a packaged chart into descriptors.
pub fn parse_chart(
    chart: &InputFile,
    values: Option<&InputFile>,
    options: &HelmOptions,
    renderer: &dyn ChartRenderer,
) -> Result<AdapterOutput, IngestError> {
    let origin = chart.name.as_str();

    if let Some(values) = values {
        validate_values(values)?;
    }

    let extracted = extract_chart(&chart.bytes, origin, &options.limits)?;
    let metadata = load_chart_metadata(extracted.root(), origin)?;
    if metadata.is_library() {
        return Err(IngestError::chart(
            origin,
            format!("{} is a library chart and renders no manifests", metadata.name),
        ));
    }
    log::info!(
        "Rendering chart {} {} as release {} in namespace {}",
        metadata.name,
        metadata.version,
        options.release,
        options.namespace
    );

    let values_path = match values {
        Some(values) => {
            let path = extracted.scratch_path("override-values.yaml");
            std::fs::write(&path, &values.bytes).map_err(|e| {
                IngestError::chart(origin, format!("failed to stage values file: {}", e))
            })?;
            Some(path)
        }
        None => None,
    };

    let request = RenderRequest {
        chart_dir: extracted.root(),
        values: values_path.as_deref(),
        release: &options.release,
        namespace: &options.namespace,
    };
    let rendered = renderer
        .render(&request)
        .map_err(|e| IngestError::chart(origin, e))?;
    if rendered.trim().is_empty() {
        return Err(IngestError::chart(origin, "chart rendered no manifests"));
    }

    let mut output = kubernetes::parse_manifests(
        &rendered,
        origin,
        &ManifestOptions::helm(options.namespace.as_str()),
    )
    .map_err(|e| match e {
        IngestError::Parse { message, .. } => {
            IngestError::chart(origin, format!("rendered output is not valid YAML: {}", message))
        }
        other => other,
    })?;
    if output.descriptors.is_empty() {
        return Err(IngestError::chart(origin, "chart rendered no resources"));
    }

    let chart_address = ResourceAddress::new(CHART_TYPE, metadata.name.as_str());
    for descriptor in &mut output.descriptors {
        descriptor.raw_references.push(RawReference::helm_membership(
            format!("chart {}", metadata.name),
            chart_address.clone(),
        ));
    }

    let mut chart_node = chart_descriptor(&metadata, options, origin);
    for dependency in &metadata.dependencies {
        let name = dependency.effective_name();
        chart_node.raw_references.push(RawReference::helm_membership(
            format!("dependency {}", name),
            ResourceAddress::new(DEPENDENCY_TYPE, name),
        ));
        output
            .descriptors
            .push(dependency_descriptor(dependency, &metadata, origin));
    }
    output.descriptors.push(chart_node);

    Ok(output)
}

/// Helm values must be a YAML mapping (or empty).
fn validate_values(values: &InputFile) -> Result<(), IngestError> {
    let parsed: serde_yaml::Value = serde_yaml::from_slice(&values.bytes)
        .map_err(|e| IngestError::values(values.name.as_str(), e))?;
    match parsed {
        serde_yaml::Value::Null | serde_yaml::Value::Mapping(_) => Ok(()),
        _ => Err(IngestError::values(
            values.name.as_str(),
            "top-level value must be a mapping",
        )),
    }
}

fn chart_descriptor(
    metadata: &ChartMetadata,
    options: &HelmOptions,
    origin: &str,
) -> ResourceDescriptor {
    let mut attributes = Map::new();
    attributes.insert("name".into(), Value::String(metadata.name.clone()));
    attributes.insert("version".into(), Value::String(metadata.version.clone()));
    attributes.insert("appVersion".into(), optional(&metadata.app_version));
    attributes.insert("description".into(), optional(&metadata.description));
    attributes.insert("apiVersion".into(), optional(&metadata.api_version));
    attributes.insert(
        "type".into(),
        Value::String(metadata.chart_type().as_str().to_string()),
    );
    attributes.insert("release".into(), Value::String(options.release.clone()));
    attributes.insert("namespace".into(), Value::String(options.namespace.clone()));

    ResourceDescriptor::new(SourceKind::Helm, CHART_TYPE, metadata.name.as_str(), origin)
        .with_attributes(attributes)
}

fn dependency_descriptor(
    dependency: &Dependency,
    metadata: &ChartMetadata,
    origin: &str,
) -> ResourceDescriptor {
    let mut attributes = Map::new();
    attributes.insert("name".into(), Value::String(dependency.name.clone()));
    attributes.insert("version".into(), optional(&dependency.version));
    attributes.insert("repository".into(), optional(&dependency.repository));
    attributes.insert("condition".into(), optional(&dependency.condition));
    attributes.insert("alias".into(), optional(&dependency.alias));
    attributes.insert("chart".into(), Value::String(metadata.name.clone()));

    ResourceDescriptor::new(
        SourceKind::Helm,
        DEPENDENCY_TYPE,
        dependency.effective_name(),
        origin,
    )
    .with_attributes(attributes)
}

fn optional(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::archive::tests::build_archive;
    use super::*;
    use crate::graph::ReferenceTarget;

    const CHART_YAML: &str = r#"apiVersion: v2
name: web
version: 0.3.1
appVersion: "1.16"
dependencies:
  - name: redis
    version: 17.0.0
    repository: https://charts.bitnami.com/bitnami
"#;

    const RENDERED: &str = r#"---
# Source: web/templates/deployment.yaml
apiVersion: apps/v1
kind: Deployment
metadata:
  name: release-name-web
spec:
  template:
    metadata:
      labels:
        app: web
"#;

    fn chart_file() -> InputFile {
        InputFile::new(
            "web-0.3.1.tgz",
            build_archive(&[
                ("web/Chart.yaml", CHART_YAML),
                ("web/templates/deployment.yaml", "{{ .Values }}"),
            ]),
        )
    }

    #[test]
    fn test_chart_node_and_membership() {
        let options = HelmOptions {
            namespace: "prod".to_string(),
            ..HelmOptions::default()
        };
        let renderer = PrerenderedManifests::new(RENDERED);
        let output = parse_chart(&chart_file(), None, &options, &renderer).unwrap();

        assert_eq!(output.descriptors.len(), 3);
        let deployment = &output.descriptors[0];
        assert_eq!(deployment.source_kind, SourceKind::Helm);
        assert_eq!(deployment.namespace.as_deref(), Some("prod"));
        assert_eq!(
            deployment.raw_references[0].target,
            ReferenceTarget::Helm(ResourceAddress::new("Chart", "web"))
        );

        let chart = output
            .descriptors
            .iter()
            .find(|d| d.raw_type == CHART_TYPE)
            .unwrap();
        assert_eq!(chart.namespace, None);
        assert_eq!(chart.attributes["version"], "0.3.1");
        assert_eq!(chart.attributes["appVersion"], "1.16");
        assert_eq!(chart.attributes["namespace"], "prod");
        assert_eq!(chart.attributes["apiVersion"], "v2");
        assert_eq!(chart.attributes["type"], "application");
        assert_eq!(chart.raw_references.len(), 1);

        let dependency = output
            .descriptors
            .iter()
            .find(|d| d.raw_type == DEPENDENCY_TYPE)
            .unwrap();
        assert_eq!(dependency.raw_name, "redis");
        assert_eq!(dependency.attributes["version"], "17.0.0");
    }

    #[test]
    fn test_library_chart_is_chart_error() {
        let chart = InputFile::new(
            "common-1.0.0.tgz",
            build_archive(&[(
                "common/Chart.yaml",
                "apiVersion: v2\nname: common\nversion: 1.0.0\ntype: library\n",
            )]),
        );
        let renderer = PrerenderedManifests::new(RENDERED);
        let err = parse_chart(&chart, None, &HelmOptions::default(), &renderer).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ChartError);
        assert!(err.to_string().contains("library chart"));
    }

    #[test]
    fn test_empty_render_is_chart_error() {
        let renderer = PrerenderedManifests::new("  \n");
        let err = parse_chart(&chart_file(), None, &HelmOptions::default(), &renderer).unwrap_err();
        assert!(matches!(err, IngestError::Chart { .. }));
    }

    #[test]
    fn test_invalid_values_is_values_error() {
        let renderer = PrerenderedManifests::new(RENDERED);
        let values = InputFile::new("values.yaml", "replicas: [1, 2");
        let err = parse_chart(&chart_file(), Some(&values), &HelmOptions::default(), &renderer)
            .unwrap_err();
        assert!(matches!(err, IngestError::Values { ref file, .. } if file == "values.yaml"));

        let scalar = InputFile::new("values.yaml", "just a string");
        let err = parse_chart(&chart_file(), Some(&scalar), &HelmOptions::default(), &renderer)
            .unwrap_err();
        assert!(matches!(err, IngestError::Values { .. }));
    }

    #[test]
    fn test_renderer_failure_is_chart_error() {
        let renderer = HelmCliRenderer::new("iacviz-no-such-helm-binary");
        let err = parse_chart(&chart_file(), None, &HelmOptions::default(), &renderer).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_corrupt_archive() {
        let renderer = PrerenderedManifests::new(RENDERED);
        let chart = InputFile::new("broken.tgz", b"\x1f\x8b garbage".to_vec());
        let err = parse_chart(&chart, None, &HelmOptions::default(), &renderer).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ChartError);
    }
}
