//! Helm chart rendering.
//!
//! Template rendering is delegated: [`HelmCliRenderer`] shells out to
//! `helm template`, [`PrerenderedManifests`] hands back output produced
//! earlier.

use std::path::Path;
use std::process::Command;
use thiserror::Error;

/// Everything a renderer needs for one chart.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub chart_dir: &'a Path,
    pub values: Option<&'a Path>,
    pub release: &'a str,
    pub namespace: &'a str,
}

/// Helm rendering errors.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("helm binary '{0}' not found in PATH")]
    HelmNotFound(String),

    #[error("render error: {0}")]
    Failed(String),
}

/// Turns an extracted chart into rendered manifest YAML.
pub trait ChartRenderer: Send + Sync {
    fn render(&self, request: &RenderRequest<'_>) -> Result<String, RenderError>;
}

/// Renders with the `helm` binary.
#[derive(Debug, Clone)]
pub struct HelmCliRenderer {
    binary: String,
}

impl HelmCliRenderer {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Get Helm version if available.
    pub fn version(&self) -> Option<String> {
        Command::new(&self.binary)
            .arg("version")
            .arg("--short")
            .output()
            .ok()
            .filter(|o| o.status.success())
            .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
    }
}

impl Default for HelmCliRenderer {
    fn default() -> Self {
        Self::new("helm")
    }
}

impl ChartRenderer for HelmCliRenderer {
    fn render(&self, request: &RenderRequest<'_>) -> Result<String, RenderError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("template")
            .arg(request.release)
            .arg(request.chart_dir)
            .arg("--namespace")
            .arg(request.namespace);

        if let Some(values_path) = request.values {
            cmd.arg("-f").arg(values_path);
        }

        log::debug!("Running {:?}", cmd);
        let output = cmd.output().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RenderError::HelmNotFound(self.binary.clone()),
            _ => RenderError::Failed(e.to_string()),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RenderError::Failed(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Manifests rendered ahead of time, e.g. saved `helm template` output.
#[derive(Debug, Clone, Default)]
pub struct PrerenderedManifests(pub String);

impl PrerenderedManifests {
    pub fn new(manifests: impl Into<String>) -> Self {
        Self(manifests.into())
    }
}

impl ChartRenderer for PrerenderedManifests {
    fn render(&self, _request: &RenderRequest<'_>) -> Result<String, RenderError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(dir: &Path) -> RenderRequest<'_> {
        RenderRequest {
            chart_dir: dir,
            values: None,
            release: "release-name",
            namespace: "default",
        }
    }

    #[test]
    fn test_prerendered_returns_manifests() {
        let renderer = PrerenderedManifests::new("kind: Service\n");
        let out = renderer.render(&request(Path::new("/tmp"))).unwrap();
        assert_eq!(out, "kind: Service\n");
    }

    #[test]
    fn test_missing_binary() {
        let renderer = HelmCliRenderer::new("iacviz-no-such-helm-binary");
        let err = renderer.render(&request(Path::new("/tmp"))).unwrap_err();
        assert!(matches!(err, RenderError::HelmNotFound(_)));
        assert!(renderer.version().is_none());
    }
}
