use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::parser::InputFormat;

#[derive(Parser)]
#[command(name = "iacviz")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build a dependency graph from Terraform, Kubernetes and Helm inputs")]
#[command(long_about = "Reads Terraform plan exports, Kubernetes manifests and packaged Helm charts, infers the relationships between their resources, and emits one graph as JSON.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest files and print the resulting graph as JSON
    Ingest {
        /// Input files or directories
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        /// Input format (inferred from the file extension when omitted)
        #[arg(short = 't', long = "type", value_enum)]
        format: Option<InputFormat>,

        /// Values override file for Helm charts
        #[arg(long, value_name = "FILE")]
        values: Option<PathBuf>,

        /// Release namespace for Helm charts
        #[arg(short, long)]
        namespace: Option<String>,

        /// Release name for Helm charts
        #[arg(long)]
        release: Option<String>,

        /// Use previously rendered manifests instead of running helm
        #[arg(long, value_name = "FILE")]
        rendered: Option<PathBuf>,

        /// Write the graph to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Start the HTTP upload server
    Serve {
        /// Host address to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
}

impl Cli {
    /// Initialize logging based on verbosity level
    pub fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }
}
