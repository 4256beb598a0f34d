//! Format adapters.
//!
//! Each adapter turns one raw input into [`ResourceDescriptor`]s plus
//! recoverable warnings:
//! - [`terraform`]: `terraform show -json` plan exports
//! - [`kubernetes`]: multi-document YAML manifests
//! - [`helm`]: packaged chart archives, rendered through a [`helm::ChartRenderer`]
//!
//! [`ResourceDescriptor`]: crate::graph::ResourceDescriptor

pub mod helm;
pub mod kubernetes;
pub mod terraform;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Raw bytes of one uploaded or read file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// File name used in warnings and errors.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, naming it by its path.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::new(path.display().to_string(), bytes))
    }
}

/// Declared format of an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    Terraform,
    Kubernetes,
    Helm,
}

impl InputFormat {
    /// Infer the format from a file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".tgz") || name.ends_with(".tar.gz") {
            Some(InputFormat::Helm)
        } else if name.ends_with(".yaml") || name.ends_with(".yml") {
            Some(InputFormat::Kubernetes)
        } else if name.ends_with(".json") {
            Some(InputFormat::Terraform)
        } else {
            None
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFormat::Terraform => write!(f, "terraform"),
            InputFormat::Kubernetes => write!(f, "kubernetes"),
            InputFormat::Helm => write!(f, "helm"),
        }
    }
}
