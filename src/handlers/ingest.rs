use crate::config::types::Config;
use crate::error::{Error, Result};
use crate::graph::{EdgeReason, Graph};
use crate::parser::helm::PrerenderedManifests;
use crate::parser::{InputFile, InputFormat};
use crate::pipeline::{HelmSource, IngestRequest, Ingestion, Ingestor, Source};
use colored::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Arguments of the `ingest` command.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub files: Vec<PathBuf>,
    pub format: Option<InputFormat>,
    pub values: Option<PathBuf>,
    pub namespace: Option<String>,
    pub release: Option<String>,
    pub rendered: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub pretty: bool,
}

pub fn handle_ingest(config: &Config, options: IngestOptions, quiet: bool) -> Result<()> {
    let request = build_request(&options)?;
    if request.sources.is_empty() {
        return Err(Error::Usage("no input files found".to_string()));
    }

    let mut ingestor = Ingestor::new(config);
    if let Some(rendered) = &options.rendered {
        let manifests = std::fs::read_to_string(rendered)?;
        ingestor = ingestor.with_renderer(PrerenderedManifests::new(manifests));
    }

    let ingestion = ingestor.ingest(&request)?;
    let json = if options.pretty {
        ingestion.graph.to_json_pretty()?
    } else {
        ingestion.graph.to_json()?
    };

    match &options.out {
        Some(path) => std::fs::write(path, format!("{}\n", json))?,
        None => println!("{}", json),
    }

    if !quiet {
        eprint!("{}", format_summary(&ingestion, options.out.as_deref()));
    }
    Ok(())
}

/// Turn command-line paths into ingestion sources.
pub fn build_request(options: &IngestOptions) -> Result<IngestRequest> {
    let mut request = IngestRequest::new();
    let mut values_used = false;

    for path in &options.files {
        if path.is_dir() {
            if options.format.is_some_and(|f| f != InputFormat::Kubernetes) {
                return Err(Error::Usage(format!(
                    "{} is a directory; only Kubernetes manifests are read from directories",
                    path.display()
                )));
            }
            for manifest in yaml_files(path)? {
                request
                    .sources
                    .push(Source::Kubernetes(InputFile::read(&manifest)?));
            }
            continue;
        }

        let format = options
            .format
            .or_else(|| InputFormat::from_path(path))
            .ok_or_else(|| {
                Error::Usage(format!(
                    "cannot infer the format of {}; pass --type",
                    path.display()
                ))
            })?;
        let file = InputFile::read(path)?;
        let source = match format {
            InputFormat::Terraform => Source::Terraform(file),
            InputFormat::Kubernetes => Source::Kubernetes(file),
            InputFormat::Helm => {
                let values = match &options.values {
                    Some(values) => {
                        values_used = true;
                        Some(InputFile::read(values)?)
                    }
                    None => None,
                };
                Source::Helm(HelmSource {
                    chart: file,
                    values,
                    namespace: options.namespace.clone(),
                    release: options.release.clone(),
                })
            }
        };
        request.sources.push(source);
    }

    if options.values.is_some() && !values_used {
        log::warn!("--values given but no Helm chart among the inputs");
    }
    Ok(request)
}

/// YAML files below `dir`, in a stable order.
fn yaml_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file()
            && InputFormat::from_path(entry.path()) == Some(InputFormat::Kubernetes)
        {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn format_summary(ingestion: &Ingestion, out: Option<&Path>) -> String {
    let graph: &Graph = &ingestion.graph;
    let mut summary = format!(
        "{} {} nodes, {} edges\n",
        "✅ Graph built:".green().bold(),
        graph.node_count(),
        graph.edge_count()
    );

    for reason in [
        EdgeReason::DependsOn,
        EdgeReason::AttributeReference,
        EdgeReason::SelectorMatch,
        EdgeReason::IngressBackend,
        EdgeReason::ConfigReference,
    ] {
        let count = graph.edges_with_reason(reason).count();
        if count > 0 {
            summary.push_str(&format!("   {:<20} {}\n", reason.as_str().cyan(), count));
        }
    }

    for warning in &ingestion.warnings {
        summary.push_str(&format!("{} {}\n", "⚠".yellow(), warning));
    }
    if let Some(path) = out {
        summary.push_str(&format!("Graph written to: {}\n", path.display()));
    }
    summary
}
