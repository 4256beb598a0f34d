//! Error types.
//!
//! [`IngestError`] is what the ingestion core returns. Input problems
//! (parse, chart, values, conflict) are kept apart from [`IngestError::Assembly`],
//! which signals a defect in the core rather than a bad upload.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors produced while turning inputs into a graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// Input is not valid in its declared format.
    #[error("failed to parse {file}: {message}")]
    Parse { file: String, message: String },

    /// Chart archive could not be opened, extracted or rendered.
    #[error("chart error in {file}: {message}")]
    Chart { file: String, message: String },

    /// Supplied values file is not valid YAML.
    #[error("invalid values file {file}: {message}")]
    Values { file: String, message: String },

    /// Two distinct resources map to the same node id.
    #[error("conflicting resources for id {id}: {}", conflict_origins(.first, .second))]
    Conflict {
        id: String,
        first: String,
        second: String,
    },

    /// Internal invariant violation.
    #[error("internal assembly error: {0}")]
    Assembly(String),
}

fn conflict_origins(first: &str, second: &str) -> String {
    if first == second {
        format!("defined twice in {} with different content", first)
    } else {
        format!("defined in {} and {}", first, second)
    }
}

/// Stable tag for each [`IngestError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ParseError,
    ChartError,
    ValuesError,
    ConflictError,
    AssemblyError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::ParseError => "parse_error",
            ErrorKind::ChartError => "chart_error",
            ErrorKind::ValuesError => "values_error",
            ErrorKind::ConflictError => "conflict_error",
            ErrorKind::AssemblyError => "assembly_error",
        };
        f.write_str(s)
    }
}

impl IngestError {
    pub fn parse(file: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.to_string(),
        }
    }

    pub fn chart(file: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Chart {
            file: file.into(),
            message: message.to_string(),
        }
    }

    pub fn values(file: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Values {
            file: file.into(),
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::Parse { .. } => ErrorKind::ParseError,
            IngestError::Chart { .. } => ErrorKind::ChartError,
            IngestError::Values { .. } => ErrorKind::ValuesError,
            IngestError::Conflict { .. } => ErrorKind::ConflictError,
            IngestError::Assembly(_) => ErrorKind::AssemblyError,
        }
    }

    /// True when the error points at a core defect, not at the input.
    pub fn is_internal(&self) -> bool {
        matches!(self, IngestError::Assembly(_))
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    ParsingFailed { path: String, message: String },
}

/// Top-level error for the CLI and server.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Usage(String),
}

pub type Result<T> = std::result::Result<T, Error>;
