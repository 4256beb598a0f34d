//! Chart.yaml parser.
//!
//! Only the metadata that ends up on the chart and dependency nodes is kept.

use crate::error::IngestError;
use serde::{Deserialize, Deserializer};
use std::path::Path;

/// Chart type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    /// Standard application chart
    #[default]
    Application,
    /// Library chart (no templates rendered directly)
    Library,
}

/// Chart dependency.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Dependency {
    pub name: String,
    /// Version constraint (SemVer)
    #[serde(default, deserialize_with = "optional_scalar")]
    pub version: Option<String>,
    pub repository: Option<String>,
    pub condition: Option<String>,
    pub alias: Option<String>,
}

impl Dependency {
    /// Name the dependency is installed under.
    pub fn effective_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Parsed Chart.yaml metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartMetadata {
    #[serde(rename = "apiVersion")]
    pub api_version: Option<String>,

    pub name: String,

    #[serde(deserialize_with = "scalar")]
    pub version: String,

    pub description: Option<String>,

    #[serde(rename = "type")]
    pub chart_type: Option<ChartType>,

    #[serde(default)]
    pub dependencies: Vec<Dependency>,

    #[serde(rename = "appVersion", default, deserialize_with = "optional_scalar")]
    pub app_version: Option<String>,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Application => "application",
            ChartType::Library => "library",
        }
    }
}

impl ChartMetadata {
    pub fn is_library(&self) -> bool {
        matches!(self.chart_type, Some(ChartType::Library))
    }

    /// Declared type, `application` when absent.
    pub fn chart_type(&self) -> ChartType {
        self.chart_type.clone().unwrap_or_default()
    }
}

/// Parse Chart.yaml content.
pub fn parse_chart_yaml(content: &str, origin: &str) -> Result<ChartMetadata, IngestError> {
    let chart: ChartMetadata = serde_yaml::from_str(content).map_err(|e| match e.location() {
        Some(loc) => IngestError::chart(origin, format!("Chart.yaml line {}: {}", loc.line(), e)),
        None => IngestError::chart(origin, format!("Chart.yaml: {}", e)),
    })?;
    if chart.name.trim().is_empty() {
        return Err(IngestError::chart(origin, "Chart.yaml has an empty name"));
    }
    Ok(chart)
}

/// Read and parse `Chart.yaml` from an extracted chart directory.
pub fn load_chart_metadata(chart_dir: &Path, origin: &str) -> Result<ChartMetadata, IngestError> {
    let path = chart_dir.join("Chart.yaml");
    let content = std::fs::read_to_string(&path)
        .map_err(|e| IngestError::chart(origin, format!("failed to read Chart.yaml: {}", e)))?;
    parse_chart_yaml(&content, origin)
}

/// Versions are often written unquoted (`version: 1.0`).
fn scalar<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    scalar_to_string(&value)
        .ok_or_else(|| serde::de::Error::custom("expected a string or number"))
}

fn optional_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    scalar_to_string(&value)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom("expected a string or number"))
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_chart() {
        let yaml = r#"
apiVersion: v2
name: test-chart
version: 0.1.0
"#;
        let chart = parse_chart_yaml(yaml, "test.tgz").unwrap();
        assert_eq!(chart.name, "test-chart");
        assert_eq!(chart.version, "0.1.0");
        assert!(chart.dependencies.is_empty());
        assert!(!chart.is_library());
        assert_eq!(chart.chart_type(), ChartType::Application);
        assert_eq!(chart.api_version.as_deref(), Some("v2"));
    }

    #[test]
    fn test_parse_full_chart() {
        let yaml = r#"
apiVersion: v2
name: my-app
version: 1.2.3
description: A sample application
type: application
appVersion: 2.0
dependencies:
  - name: postgresql
    version: "~11.0"
    repository: https://charts.bitnami.com/bitnami
    condition: postgresql.enabled
  - name: redis
    alias: cache
"#;
        let chart = parse_chart_yaml(yaml, "my-app.tgz").unwrap();
        assert_eq!(chart.description.as_deref(), Some("A sample application"));
        assert_eq!(chart.app_version.as_deref(), Some("2.0"));
        assert_eq!(chart.dependencies.len(), 2);
        assert_eq!(chart.dependencies[0].version.as_deref(), Some("~11.0"));
        assert_eq!(chart.dependencies[1].effective_name(), "cache");
    }

    #[test]
    fn test_parse_library_chart() {
        let yaml = "apiVersion: v2\nname: common\nversion: 1.0.0\ntype: library\n";
        let chart = parse_chart_yaml(yaml, "common.tgz").unwrap();
        assert!(chart.is_library());
        assert_eq!(chart.chart_type().as_str(), "library");
    }

    #[test]
    fn test_parse_error() {
        let err = parse_chart_yaml("invalid: [yaml", "bad.tgz").unwrap_err();
        assert!(matches!(err, IngestError::Chart { .. }));

        let err = parse_chart_yaml("version: 1.0.0\n", "noname.tgz").unwrap_err();
        assert!(err.to_string().contains("noname.tgz"));
    }
}
