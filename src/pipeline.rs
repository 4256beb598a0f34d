//! Ingestion pipeline.
//!
//! raw bytes → adapter → descriptors → normalizer → resolvers → assembler → [`Graph`]
//!
//! Every call builds its own intermediate state, so one [`Ingestor`] can
//! serve concurrent requests.

use crate::assembler;
use crate::config::types::Config;
use crate::error::IngestError;
use crate::graph::{AdapterOutput, Graph};
use crate::normalizer;
use crate::parser::helm::{self, ArchiveLimits, ChartRenderer, HelmCliRenderer, HelmOptions};
use crate::parser::kubernetes::{self, ManifestOptions};
use crate::parser::{InputFile, InputFormat, terraform};
use crate::resolver;
use rayon::prelude::*;

/// A packaged chart and how to render it.
#[derive(Debug, Clone)]
pub struct HelmSource {
    pub chart: InputFile,
    pub values: Option<InputFile>,
    /// Release namespace; the configured default when unset.
    pub namespace: Option<String>,
    /// Release name; the configured default when unset.
    pub release: Option<String>,
}

impl HelmSource {
    pub fn new(chart: InputFile) -> Self {
        Self {
            chart,
            values: None,
            namespace: None,
            release: None,
        }
    }
}

/// One input of an ingestion request.
#[derive(Debug, Clone)]
pub enum Source {
    Terraform(InputFile),
    Kubernetes(InputFile),
    Helm(HelmSource),
}

impl Source {
    pub fn format(&self) -> InputFormat {
        match self {
            Source::Terraform(_) => InputFormat::Terraform,
            Source::Kubernetes(_) => InputFormat::Kubernetes,
            Source::Helm(_) => InputFormat::Helm,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Source::Terraform(file) | Source::Kubernetes(file) => &file.name,
            Source::Helm(helm) => &helm.chart.name,
        }
    }
}

/// All inputs whose resources end up in one graph.
#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
    pub sources: Vec<Source>,
}

impl IngestRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }
}

/// The graph plus the recoverable anomalies met while building it.
#[derive(Debug, Clone)]
pub struct Ingestion {
    pub graph: Graph,
    pub warnings: Vec<String>,
}

/// Runs ingestion requests against one configuration.
pub struct Ingestor {
    default_namespace: String,
    release_name: String,
    limits: ArchiveLimits,
    renderer: Box<dyn ChartRenderer>,
}

impl Ingestor {
    /// Ingestor rendering charts with the configured helm binary.
    pub fn new(config: &Config) -> Self {
        Self {
            default_namespace: config.ingest.default_namespace.clone(),
            release_name: config.ingest.release_name.clone(),
            limits: ArchiveLimits {
                max_entries: config.limits.max_archive_entries,
                max_decompressed_bytes: config.limits.max_decompressed_bytes,
            },
            renderer: Box::new(HelmCliRenderer::new(config.helm.binary.as_str())),
        }
    }

    /// Replace the chart renderer.
    pub fn with_renderer(mut self, renderer: impl ChartRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Parse every source, then normalize, resolve and assemble.
    ///
    /// Sources are parsed concurrently; when several fail, the error of the
    /// first failing source in request order is returned.
    pub fn ingest(&self, request: &IngestRequest) -> Result<Ingestion, IngestError> {
        log::info!("Ingesting {} sources", request.sources.len());

        let parsed: Vec<Result<AdapterOutput, IngestError>> = request
            .sources
            .par_iter()
            .map(|source| self.parse_source(source))
            .collect();

        let mut combined = AdapterOutput::new();
        for result in parsed {
            combined.extend(result?);
        }

        let set = normalizer::normalize(combined.descriptors)?;
        let edges = resolver::run_all(&set);
        let graph = assembler::assemble(set.nodes().cloned(), edges)?;

        log::info!(
            "Built graph with {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(Ingestion {
            graph,
            warnings: combined.warnings,
        })
    }

    fn parse_source(&self, source: &Source) -> Result<AdapterOutput, IngestError> {
        log::debug!("Parsing {} as {}", source.name(), source.format());
        match source {
            Source::Terraform(file) => terraform::parse_plan(&file.bytes, &file.name),
            Source::Kubernetes(file) => {
                let content = std::str::from_utf8(&file.bytes)
                    .map_err(|e| IngestError::parse(file.name.as_str(), e))?;
                let options = ManifestOptions {
                    default_namespace: self.default_namespace.clone(),
                    ..ManifestOptions::default()
                };
                kubernetes::parse_manifests(content, &file.name, &options)
            }
            Source::Helm(source) => {
                let options = HelmOptions {
                    namespace: source
                        .namespace
                        .clone()
                        .unwrap_or_else(|| self.default_namespace.clone()),
                    release: source
                        .release
                        .clone()
                        .unwrap_or_else(|| self.release_name.clone()),
                    limits: self.limits,
                };
                helm::parse_chart(
                    &source.chart,
                    source.values.as_ref(),
                    &options,
                    self.renderer.as_ref(),
                )
            }
        }
    }
}

impl Default for Ingestor {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
