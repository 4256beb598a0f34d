//! # IaC Visualizer
//!
//! Ingests Terraform plan exports, Kubernetes manifests and packaged Helm
//! charts and produces one dependency graph: resources as nodes, inferred
//! relationships as reason-tagged edges.
//!
//! ## Pipeline
//!
//! - **Adapters** ([`parser`]) turn each input into resource descriptors.
//! - The **normalizer** ([`normalizer`]) assigns node ids and rejects collisions.
//! - **Resolvers** ([`resolver`]) infer `depends_on`, `attribute_reference`,
//!   `selector_match`, `ingress_backend` and `config_reference` edges.
//! - The **assembler** ([`assembler`]) dedups edges and builds the [`Graph`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use iac_visualizer::{IngestRequest, Ingestor, InputFile, Source};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let plan = std::fs::read("plan.json")?;
//! let request = IngestRequest::new().with_source(Source::Terraform(InputFile::new("plan.json", plan)));
//! let ingestion = Ingestor::default().ingest(&request)?;
//! println!("{}", ingestion.graph.to_json_pretty()?);
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod handlers;
pub mod normalizer;
pub mod parser;
pub mod pipeline;
pub mod resolver;
pub mod server;

// Re-export commonly used types and functions
pub use error::{Error, ErrorKind, IngestError, Result};
pub use graph::{Edge, EdgeReason, Graph, Node};
pub use parser::{InputFile, InputFormat};
pub use pipeline::{HelmSource, IngestRequest, Ingestion, Ingestor, Source};

/// The current version of the CLI tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
