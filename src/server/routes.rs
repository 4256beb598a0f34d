//! HTTP routes.
//!
//! - `GET /health`
//! - `POST /api/parse/terraform` (multipart `file`)
//! - `POST /api/parse/kubernetes` (multipart `files`, repeated)
//! - `POST /api/parse/helm` (multipart `chart`, optional `values`)

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use super::ServerState;
use crate::error::IngestError;
use crate::graph::Graph;
use crate::parser::InputFile;
use crate::pipeline::{HelmSource, IngestRequest, Source};

/// Health check endpoint.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "iacviz",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn parse_terraform(
    State(state): State<ServerState>,
    multipart: Multipart,
) -> Result<Json<Graph>, ApiError> {
    let mut fields = read_fields(multipart).await?;
    let file = take_field(&mut fields, "file")?;
    run(&state, IngestRequest::new().with_source(Source::Terraform(file))).await
}

pub async fn parse_kubernetes(
    State(state): State<ServerState>,
    multipart: Multipart,
) -> Result<Json<Graph>, ApiError> {
    let sources: Vec<Source> = read_fields(multipart)
        .await?
        .into_iter()
        .filter(|(name, _)| name == "files" || name == "file")
        .map(|(_, file)| Source::Kubernetes(file))
        .collect();
    if sources.is_empty() {
        return Err(ApiError::BadRequest(
            "missing multipart field 'files'".to_string(),
        ));
    }
    run(&state, IngestRequest { sources }).await
}

/// Query parameters for the Helm route.
#[derive(Debug, Default, Deserialize)]
pub struct HelmQuery {
    pub namespace: Option<String>,
    pub release_name: Option<String>,
}

pub async fn parse_helm(
    State(state): State<ServerState>,
    Query(query): Query<HelmQuery>,
    multipart: Multipart,
) -> Result<Json<Graph>, ApiError> {
    let mut fields = read_fields(multipart).await?;
    let chart = take_field(&mut fields, "chart")?;
    let values = take_field(&mut fields, "values").ok();

    let source = HelmSource {
        chart,
        values,
        namespace: query.namespace.filter(|ns| !ns.is_empty()),
        release: query.release_name.filter(|r| !r.is_empty()),
    };
    run(&state, IngestRequest::new().with_source(Source::Helm(source))).await
}

async fn run(state: &ServerState, request: IngestRequest) -> Result<Json<Graph>, ApiError> {
    let ingestor = state.ingestor();
    let ingestion = tokio::task::spawn_blocking(move || ingestor.ingest(&request))
        .await
        .map_err(|e| ApiError::Internal(format!("ingestion task failed: {}", e)))??;

    for warning in &ingestion.warnings {
        debug!("ingestion warning: {}", warning);
    }
    Ok(Json(ingestion.graph))
}

/// Collect every multipart field as (field name, file).
async fn read_fields(mut multipart: Multipart) -> Result<Vec<(String, InputFile)>, ApiError> {
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field
            .file_name()
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| name.clone());
        let bytes = field.bytes().await?;
        fields.push((name, InputFile::new(file_name, bytes.to_vec())));
    }
    Ok(fields)
}

fn take_field(fields: &mut Vec<(String, InputFile)>, name: &str) -> Result<InputFile, ApiError> {
    let position = fields
        .iter()
        .position(|(field, _)| field == name)
        .ok_or_else(|| ApiError::BadRequest(format!("missing multipart field '{}'", name)))?;
    Ok(fields.remove(position).1)
}

/// Error returned by the HTTP layer.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message, internal) = match self {
            ApiError::Ingest(e) => {
                let status = match &e {
                    IngestError::Parse { .. }
                    | IngestError::Chart { .. }
                    | IngestError::Values { .. } => StatusCode::BAD_REQUEST,
                    IngestError::Conflict { .. } => StatusCode::CONFLICT,
                    IngestError::Assembly(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.kind().to_string(), e.to_string(), e.is_internal())
            }
            ApiError::Multipart(e) => (e.status(), "bad_request".to_string(), e.body_text(), false),
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, "bad_request".to_string(), message, false)
            }
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error".to_string(),
                message,
                true,
            ),
        };

        if internal {
            warn!("internal error: {}", message);
        } else {
            debug!("rejected upload: {}", message);
        }

        let body = json!({
            "error": {
                "kind": kind,
                "message": message,
                "internal": internal,
            }
        });
        (status, Json(body)).into_response()
    }
}
