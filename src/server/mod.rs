//! HTTP upload layer.
//!
//! Thin axum front over [`Ingestor`]: each upload becomes one ingestion
//! request, run on the blocking pool, answered with the graph JSON.
//!
//! # Usage
//!
//! ```rust,ignore
//! use iac_visualizer::config::types::Config;
//! use iac_visualizer::server::VizServer;
//!
//! let server = VizServer::new(&Config::default());
//! server.run().await?;
//! ```

pub mod routes;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::types::{Config, ServerConfig};
use crate::pipeline::Ingestor;

/// Shared state for request handlers.
#[derive(Clone)]
pub struct ServerState {
    ingestor: Arc<Ingestor>,
}

impl ServerState {
    pub fn new(ingestor: Ingestor) -> Self {
        Self {
            ingestor: Arc::new(ingestor),
        }
    }

    pub fn ingestor(&self) -> Arc<Ingestor> {
        Arc::clone(&self.ingestor)
    }
}

/// Build the application router.
pub fn router(state: ServerState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/parse/terraform", post(routes::parse_terraform))
        .route("/api/parse/kubernetes", post(routes::parse_kubernetes))
        .route("/api/parse/helm", post(routes::parse_helm))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// The HTTP server.
pub struct VizServer {
    config: ServerConfig,
    max_upload_bytes: usize,
    state: ServerState,
}

impl VizServer {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.server.clone(),
            max_upload_bytes: config.limits.max_upload_bytes,
            state: ServerState::new(Ingestor::new(config)),
        }
    }

    /// Sets the port number.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the host address.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Returns the address the server will listen on.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Runs the server until Ctrl-C.
    pub async fn run(self) -> Result<(), std::io::Error> {
        let listener =
            tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        tracing::info!("iacviz server listening on http://{}", listener.local_addr()?);

        let app = router(self.state, self.max_upload_bytes);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
