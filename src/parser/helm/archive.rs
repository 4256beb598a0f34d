//! Guarded extraction of packaged chart archives.
//!
//! Archives are scanned once to enforce entry-count and size limits before
//! anything touches the disk, then unpacked into a temporary directory that
//! is removed when the returned [`ExtractedChart`] is dropped.

use crate::error::IngestError;
use flate2::read::GzDecoder;
use std::path::{Path, PathBuf};
use tar::{Archive, EntryType};
use tempfile::TempDir;

pub const DEFAULT_MAX_ENTRIES: usize = 4096;
pub const DEFAULT_MAX_DECOMPRESSED_BYTES: u64 = 64 * 1024 * 1024;

/// Bounds applied to an archive before extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveLimits {
    pub max_entries: usize,
    pub max_decompressed_bytes: u64,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_decompressed_bytes: DEFAULT_MAX_DECOMPRESSED_BYTES,
        }
    }
}

/// A chart unpacked into a scoped temporary directory.
#[derive(Debug)]
pub struct ExtractedChart {
    dir: TempDir,
    root: PathBuf,
}

impl ExtractedChart {
    /// Directory holding `Chart.yaml`.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scratch location inside the temporary directory, outside the chart.
    pub fn scratch_path(&self, file_name: &str) -> PathBuf {
        self.dir.path().join(file_name)
    }
}

/// Validate and extract a gzipped chart tarball.
pub fn extract_chart(
    bytes: &[u8],
    origin: &str,
    limits: &ArchiveLimits,
) -> Result<ExtractedChart, IngestError> {
    check_limits(bytes, origin, limits)?;

    let dir = tempfile::Builder::new()
        .prefix("iacviz-chart-")
        .tempdir()
        .map_err(|e| IngestError::chart(origin, format!("failed to create temp dir: {}", e)))?;
    let unpack_root = dir.path().join("chart");
    std::fs::create_dir(&unpack_root)
        .map_err(|e| IngestError::chart(origin, format!("failed to create temp dir: {}", e)))?;

    let mut archive = Archive::new(GzDecoder::new(bytes));
    let entries = archive.entries().map_err(|e| archive_error(origin, e))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| archive_error(origin, e))?;
        let entry_type = entry.header().entry_type();
        if !matches!(entry_type, EntryType::Regular | EntryType::Directory) {
            log::debug!("{}: skipping {:?} entry", origin, entry_type);
            continue;
        }
        let unpacked = entry
            .unpack_in(&unpack_root)
            .map_err(|e| archive_error(origin, e))?;
        if !unpacked {
            log::warn!("{}: refused archive entry outside the chart directory", origin);
        }
    }

    let root = find_chart_root(&unpack_root).ok_or_else(|| {
        IngestError::chart(origin, "archive does not contain a Chart.yaml")
    })?;
    log::debug!("{}: extracted chart to {}", origin, root.display());

    Ok(ExtractedChart { dir, root })
}

/// First pass: count entries and sum declared sizes without writing anything.
fn check_limits(bytes: &[u8], origin: &str, limits: &ArchiveLimits) -> Result<(), IngestError> {
    let mut archive = Archive::new(GzDecoder::new(bytes));
    let entries = archive.entries().map_err(|e| archive_error(origin, e))?;

    let mut count = 0usize;
    let mut total = 0u64;
    for entry in entries {
        let entry = entry.map_err(|e| archive_error(origin, e))?;
        count += 1;
        if count > limits.max_entries {
            return Err(IngestError::chart(
                origin,
                format!("archive has more than {} entries", limits.max_entries),
            ));
        }
        let size = entry.header().size().map_err(|e| archive_error(origin, e))?;
        total = total.saturating_add(size);
        if total > limits.max_decompressed_bytes {
            return Err(IngestError::chart(
                origin,
                format!(
                    "archive expands beyond {} bytes",
                    limits.max_decompressed_bytes
                ),
            ));
        }
    }

    if count == 0 {
        return Err(IngestError::chart(origin, "archive is empty"));
    }
    Ok(())
}

/// `helm package` nests everything under `<chart-name>/`.
fn find_chart_root(dir: &Path) -> Option<PathBuf> {
    if dir.join("Chart.yaml").is_file() {
        return Some(dir.to_path_buf());
    }
    let mut children: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    children.sort();
    children
        .into_iter()
        .find(|path| path.join("Chart.yaml").is_file())
}

fn archive_error(origin: &str, e: std::io::Error) -> IngestError {
    IngestError::chart(origin, format!("failed to read chart archive: {}", e))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    /// Build a gzipped tarball in memory.
    pub(crate) fn build_archive(files: &[(&str, &str)]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (path, content) in files {
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
    fn test_extract_nested_chart() {
        let bytes = build_archive(&[
            ("web/Chart.yaml", "apiVersion: v2\nname: web\nversion: 0.1.0\n"),
            ("web/templates/deployment.yaml", "kind: Deployment\n"),
        ]);
        let chart = extract_chart(&bytes, "web.tgz", &ArchiveLimits::default()).unwrap();
        assert!(chart.root().ends_with("web"));
        assert!(chart.root().join("templates/deployment.yaml").is_file());
    }

    #[test]
    fn test_temp_dir_removed_on_drop() {
        let bytes = build_archive(&[("web/Chart.yaml", "name: web\nversion: 1\n")]);
        let chart = extract_chart(&bytes, "web.tgz", &ArchiveLimits::default()).unwrap();
        let root = chart.root().to_path_buf();
        assert!(root.exists());
        drop(chart);
        assert!(!root.exists());
    }

    #[test]
    fn test_entry_limit() {
        let bytes = build_archive(&[
            ("web/Chart.yaml", "name: web\n"),
            ("web/values.yaml", "{}\n"),
            ("web/templates/a.yaml", "kind: A\n"),
        ]);
        let limits = ArchiveLimits {
            max_entries: 2,
            ..ArchiveLimits::default()
        };
        let err = extract_chart(&bytes, "web.tgz", &limits).unwrap_err();
        assert!(err.to_string().contains("more than 2 entries"));
    }

    #[test]
    fn test_size_limit() {
        let big = "x".repeat(2048);
        let bytes = build_archive(&[("web/Chart.yaml", "name: web\n"), ("web/big.txt", &big)]);
        let limits = ArchiveLimits {
            max_decompressed_bytes: 1024,
            ..ArchiveLimits::default()
        };
        let err = extract_chart(&bytes, "web.tgz", &limits).unwrap_err();
        assert!(matches!(err, IngestError::Chart { .. }));
    }

    #[test]
    fn test_not_an_archive() {
        let err = extract_chart(b"definitely not gzip", "junk.tgz", &ArchiveLimits::default())
            .unwrap_err();
        assert!(matches!(err, IngestError::Chart { ref file, .. } if file == "junk.tgz"));
    }

    #[test]
    fn test_missing_chart_yaml() {
        let bytes = build_archive(&[("web/values.yaml", "replicas: 1\n")]);
        let err = extract_chart(&bytes, "web.tgz", &ArchiveLimits::default()).unwrap_err();
        assert!(err.to_string().contains("Chart.yaml"));
    }
}
