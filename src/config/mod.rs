pub mod types;

use crate::error::{ConfigError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = ".iacviz.toml";

/// Get the global config file path (~/.iacviz.toml)
pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(CONFIG_FILE_NAME))
}

/// Get the local config file path (./.iacviz.toml)
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}

/// Load configuration from file or use defaults.
///
/// An explicit path must exist and parse. Otherwise the local config is
/// checked first, then the global one; unreadable or invalid implicit files
/// are skipped with a warning.
pub fn load_config(explicit: Option<&Path>) -> Result<types::Config> {
    if let Some(path) = explicit {
        return Ok(read_config(path)?);
    }

    let candidates = std::env::current_dir()
        .ok()
        .map(|cwd| local_config_path(&cwd))
        .into_iter()
        .chain(global_config_path());
    for path in candidates {
        if !path.exists() {
            continue;
        }
        match read_config(&path) {
            Ok(config) => {
                log::debug!("Loaded config from {}", path.display());
                return Ok(config);
            }
            Err(e) => log::warn!("Ignoring {}", e),
        }
    }

    Ok(types::Config::default())
}

/// Read and parse one config file.
pub fn read_config(path: &Path) -> std::result::Result<types::Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::ParsingFailed {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[server]\nport = 9100\n\n[helm]\nbinary = \"/opt/helm/bin/helm\"\n")
            .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.helm.binary, "/opt/helm/bin/helm");
        assert_eq!(config.ingest.default_namespace, "default");
        assert_eq!(config.limits.max_archive_entries, 4096);
    }

    #[test]
    fn test_explicit_path_errors_propagate() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            read_config(&missing),
            Err(ConfigError::ReadFailed { .. })
        ));

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "[server\nport = ").unwrap();
        assert!(load_config(Some(&broken)).is_err());
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let config = types::Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: types::Config = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
