use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ingest: IngestConfig,
    pub limits: LimitsConfig,
    pub helm: HelmConfig,
    pub server: ServerConfig,
}

/// Ingestion defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Namespace given to namespaced Kubernetes objects that declare none
    pub default_namespace: String,
    /// Release name passed to `helm template`
    pub release_name: String,
}

/// Resource bounds for uploads and chart archives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_archive_entries: usize,
    pub max_decompressed_bytes: u64,
    pub max_upload_bytes: usize,
}

/// Helm rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelmConfig {
    /// Path or name of the helm binary
    pub binary: String,
}

/// HTTP server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            default_namespace: "default".to_string(),
            release_name: "release-name".to_string(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_archive_entries: 4096,
            max_decompressed_bytes: 64 * 1024 * 1024, // 64MB
            max_upload_bytes: 32 * 1024 * 1024,       // 32MB
        }
    }
}

impl Default for HelmConfig {
    fn default() -> Self {
        Self {
            binary: "helm".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}
