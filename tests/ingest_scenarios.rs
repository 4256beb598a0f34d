//! End-to-end ingestion scenarios over the fixtures in `tests/fixtures`.

use flate2::Compression;
use flate2::write::GzEncoder;
use iac_visualizer::parser::helm::PrerenderedManifests;
use iac_visualizer::{
    Edge, EdgeReason, ErrorKind, Graph, HelmSource, IngestError, IngestRequest, Ingestor,
    InputFile, Source,
};
use std::path::Path;

fn fixture(path: &str) -> InputFile {
    let full = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(path);
    let bytes = std::fs::read(&full).unwrap();
    InputFile::new(path, bytes)
}

fn ingest(sources: Vec<Source>) -> Result<Graph, IngestError> {
    Ingestor::default()
        .ingest(&IngestRequest { sources })
        .map(|i| i.graph)
}

fn chart_archive(chart_yaml: &str) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, content) in [
        ("web/Chart.yaml", chart_yaml),
        ("web/values.yaml", "replicaCount: 1\n"),
        ("web/templates/deployment.yaml", "apiVersion: apps/v1\nkind: Deployment\n"),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

#[test]
fn test_terraform_attribute_reference() {
    let graph = ingest(vec![Source::Terraform(fixture("terraform/vpc.plan.json"))]).unwrap();

    let ids: Vec<_> = graph.nodes().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["tf.aws_subnet:sub", "tf.aws_vpc:main"]);
    assert_eq!(
        graph.edges(),
        &[Edge::new(
            "tf.aws_subnet:sub",
            "tf.aws_vpc:main",
            EdgeReason::AttributeReference
        )]
    );

    let vpc = graph.node("tf.aws_vpc:main").unwrap();
    assert_eq!(vpc.type_, "tf.aws_vpc");
    assert_eq!(vpc.name, "main");
    assert_eq!(vpc.namespace, None);
    assert_eq!(vpc.attributes["cidr_block"], "10.0.0.0/16");
}

#[test]
fn test_empty_plan_is_an_empty_graph() {
    let graph = ingest(vec![Source::Terraform(fixture("terraform/empty.plan.json"))]).unwrap();
    assert!(graph.is_empty());
    assert_eq!(graph.edge_count(), 0);
    assert_eq!(graph.to_json().unwrap(), r#"{"nodes":[],"edges":[]}"#);
}

#[test]
fn test_service_selects_deployment_in_same_namespace() {
    let graph = ingest(vec![Source::Kubernetes(fixture("kubernetes/web.yaml"))]).unwrap();

    assert_eq!(graph.node_count(), 3);
    let selector: Vec<_> = graph.edges_with_reason(EdgeReason::SelectorMatch).collect();
    assert_eq!(
        selector,
        vec![&Edge::new(
            "k8s.Service:default/web",
            "k8s.Deployment:default/web",
            EdgeReason::SelectorMatch
        )]
    );
    let config: Vec<_> = graph.edges_with_reason(EdgeReason::ConfigReference).collect();
    assert_eq!(config.len(), 1);
    assert_eq!(config[0].to_id, "k8s.ConfigMap:default/web-config");
}

#[test]
fn test_selector_does_not_cross_namespaces() {
    let service = "kind: Service\nmetadata:\n  name: web\n  namespace: default\nspec:\n  selector:\n    app: web\n";
    let deployment = "kind: Deployment\nmetadata:\n  name: web\n  namespace: prod\nspec:\n  template:\n    metadata:\n      labels:\n        app: web\n";
    let graph = ingest(vec![
        Source::Kubernetes(InputFile::new("svc.yaml", service)),
        Source::Kubernetes(InputFile::new("deploy.yaml", deployment)),
    ])
    .unwrap();

    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn test_ingress_backend_present() {
    let graph = ingest(vec![Source::Kubernetes(fixture("kubernetes/shop-ingress.yaml"))]).unwrap();
    assert_eq!(
        graph.edges(),
        &[Edge::new(
            "k8s.Ingress:prod/shop",
            "k8s.Service:prod/checkout",
            EdgeReason::IngressBackend
        )]
    );
}

#[test]
fn test_ingress_backend_absent() {
    let ingress = "apiVersion: networking.k8s.io/v1\nkind: Ingress\nmetadata:\n  name: shop\n  namespace: prod\nspec:\n  defaultBackend:\n    service:\n      name: checkout\n      port:\n        number: 80\n";
    let graph = ingest(vec![Source::Kubernetes(InputFile::new("ingress.yaml", ingress))]).unwrap();
    assert_eq!(graph.node_count(), 1);
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn test_helm_chart_membership() {
    let chart = InputFile::new(
        "web-0.1.0.tgz",
        chart_archive("apiVersion: v2\nname: web\nversion: 0.1.0\n"),
    );
    let rendered = std::fs::read_to_string(
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/helm/web.rendered.yaml"),
    )
    .unwrap();

    let ingestion = Ingestor::default()
        .with_renderer(PrerenderedManifests::new(rendered))
        .ingest(&IngestRequest::new().with_source(Source::Helm(HelmSource::new(chart))))
        .unwrap();
    let graph = ingestion.graph;

    let ids: Vec<_> = graph.nodes().map(|n| n.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["helm.Chart:web", "helm.Deployment:default/release-name-web"]
    );
    assert_eq!(
        graph.edges(),
        &[Edge::new(
            "helm.Deployment:default/release-name-web",
            "helm.Chart:web",
            EdgeReason::DependsOn
        )]
    );
    let chart_node = graph.node("helm.Chart:web").unwrap();
    assert_eq!(chart_node.type_, "helm.Chart");
    assert_eq!(chart_node.attributes["version"], "0.1.0");
}

#[test]
fn test_helm_with_values_and_namespace() {
    let chart = InputFile::new(
        "web.tgz",
        chart_archive("apiVersion: v2\nname: web\nversion: 0.1.0\ndependencies:\n  - name: redis\n    version: 17.0.0\n"),
    );
    let mut source = HelmSource::new(chart);
    source.values = Some(InputFile::new("prod-values.yaml", "replicaCount: 3\n"));
    source.namespace = Some("prod".to_string());

    let rendered = "kind: Deployment\nmetadata:\n  name: web\n";
    let graph = Ingestor::default()
        .with_renderer(PrerenderedManifests::new(rendered))
        .ingest(&IngestRequest::new().with_source(Source::Helm(source)))
        .unwrap()
        .graph;

    assert!(graph.contains("helm.Deployment:prod/web"));
    assert!(graph
        .edges()
        .contains(&Edge::new("helm.Chart:web", "helm.Dependency:redis", EdgeReason::DependsOn)));
}

#[test]
fn test_helm_and_manifest_sources_overlap() {
    let chart = InputFile::new(
        "web.tgz",
        chart_archive("apiVersion: v2\nname: web\nversion: 0.1.0\n"),
    );
    let rendered = "kind: Deployment\nmetadata:\n  name: web\nspec:\n  template:\n    metadata:\n      labels:\n        app: web\n";
    let service = "kind: Service\nmetadata:\n  name: web\nspec:\n  selector:\n    app: web\n";

    let graph = Ingestor::default()
        .with_renderer(PrerenderedManifests::new(rendered))
        .ingest(
            &IngestRequest::new()
                .with_source(Source::Helm(HelmSource::new(chart)))
                .with_source(Source::Kubernetes(InputFile::new("svc.yaml", service))),
        )
        .unwrap()
        .graph;

    assert!(graph.edges().contains(&Edge::new(
        "k8s.Service:default/web",
        "helm.Deployment:default/web",
        EdgeReason::SelectorMatch
    )));
}

#[test]
fn test_conflicting_manifests() {
    let a = "kind: ConfigMap\nmetadata:\n  name: app\ndata:\n  mode: a\n";
    let b = "kind: ConfigMap\nmetadata:\n  name: app\ndata:\n  mode: b\n";
    let err = ingest(vec![
        Source::Kubernetes(InputFile::new("b.yaml", b)),
        Source::Kubernetes(InputFile::new("a.yaml", a)),
    ])
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConflictError);
    assert!(!err.is_internal());
    assert_eq!(
        err,
        IngestError::Conflict {
            id: "k8s.ConfigMap:default/app".to_string(),
            first: "a.yaml".to_string(),
            second: "b.yaml".to_string(),
        }
    );
}

#[test]
fn test_same_manifest_uploaded_twice() {
    let graph = ingest(vec![
        Source::Kubernetes(fixture("kubernetes/web.yaml")),
        Source::Kubernetes(fixture("kubernetes/web.yaml")),
    ])
    .unwrap();
    assert_eq!(graph.node_count(), 3);
}

#[test]
fn test_malformed_inputs() {
    let err = ingest(vec![Source::Terraform(InputFile::new("plan.json", "[1, 2"))]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ParseError);

    let err = ingest(vec![Source::Terraform(InputFile::new(
        "state.json",
        r#"{"values": {}}"#,
    ))])
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ParseError);

    let err = ingest(vec![Source::Kubernetes(InputFile::new(
        "broken.yaml",
        "kind: [Service\nmetadata: {name: web\n",
    ))])
    .unwrap_err();
    assert!(matches!(err, IngestError::Parse { ref file, .. } if file == "broken.yaml"));
}

#[test]
fn test_wire_format() {
    let graph = ingest(vec![Source::Kubernetes(fixture("kubernetes/shop-ingress.yaml"))]).unwrap();
    let json: serde_json::Value = serde_json::from_str(&graph.to_json().unwrap()).unwrap();

    let node = &json["nodes"][0];
    for key in ["id", "name", "type", "attributes", "namespace"] {
        assert!(node.get(key).is_some(), "missing node field {}", key);
    }
    let edge = &json["edges"][0];
    assert_eq!(edge["from_id"], "k8s.Ingress:prod/shop");
    assert_eq!(edge["to_id"], "k8s.Service:prod/checkout");
    assert_eq!(edge["reason"], "ingress_backend");
}
