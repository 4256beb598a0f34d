use clap::Parser;
use colored::*;
use iac_visualizer::cli::{Cli, Commands};
use iac_visualizer::handlers::{self, IngestOptions};
use iac_visualizer::{config, Error};
use std::process;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        let code = match e {
            Error::Usage(_) => 2,
            _ => 1,
        };
        process::exit(code);
    }
}

async fn run() -> iac_visualizer::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    cli.init_logging();

    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Ingest {
            files,
            format,
            values,
            namespace,
            release,
            rendered,
            out,
            pretty,
        } => {
            let options = IngestOptions {
                files,
                format,
                values,
                namespace,
                release,
                rendered,
                out,
                pretty,
            };
            handlers::handle_ingest(&config, options, cli.quiet)
        }
        Commands::Serve { host, port } => handlers::handle_serve(&config, host, port).await,
    }
}
