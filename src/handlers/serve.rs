use crate::config::types::Config;
use crate::parser::helm::HelmCliRenderer;
use crate::server::VizServer;
use colored::*;

pub async fn handle_serve(
    config: &Config,
    host: Option<String>,
    port: Option<u16>,
) -> crate::Result<()> {
    let mut server = VizServer::new(config);
    if let Some(host) = host {
        server = server.host(host);
    }
    if let Some(port) = port {
        server = server.port(port);
    }

    match HelmCliRenderer::new(config.helm.binary.as_str()).version() {
        Some(version) => log::info!("Rendering charts with helm {}", version),
        None => eprintln!(
            "{} `{}` not found; chart uploads will fail",
            "⚠ helm:".yellow(),
            config.helm.binary
        ),
    }

    eprintln!(
        "{} http://{}",
        "🚀 Starting iacviz server on".bright_cyan().bold(),
        server.addr()
    );
    server.run().await?;
    Ok(())
}
