//! HTTP API for ListingForge.
//!
//! Three JSON endpoints over a shared [`Pipeline`]:
//! - `POST /api/optimize` runs one optimization and returns the stored record
//! - `GET /api/history` lists every record, newest first
//! - `GET /api/history/:asin` lists one ASIN's records, newest first

use std::net::SocketAddr;

use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use listingforge_core::{Pipeline, PipelineError, PipelineStep, SilentProgress};
use listingforge_shared::{ListingForgeError, OptimizationRecord, Result, ValidationIssue};

const INVALID_ASIN: &str = "Invalid ASIN format";

// --- Error Handling ---
#[derive(Debug)]
pub enum AppError {
    /// Request body failed validation; every issue is returned.
    Validation(Vec<ValidationIssue>),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": INVALID_ASIN, "errors": errors })),
            )
                .into_response(),
            AppError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
            }
            AppError::Internal(message) => {
                tracing::error!(%message, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": message })),
                )
                    .into_response()
            }
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match (err.step, err.kind) {
            (PipelineStep::Validate, ListingForgeError::Validation { issues, .. }) => {
                AppError::Validation(issues)
            }
            (PipelineStep::Validate | PipelineStep::Fetch, kind) => {
                AppError::BadRequest(kind.to_string())
            }
            (PipelineStep::Optimize | PipelineStep::Store, kind) => {
                AppError::Internal(kind.to_string())
            }
        }
    }
}

// --- Request Types ---
#[derive(Deserialize)]
struct OptimizeRequest {
    asin: Option<Value>,
}

impl OptimizeRequest {
    /// The `asin` field as a string, or the issue explaining why it isn't one.
    fn asin(self) -> std::result::Result<String, ValidationIssue> {
        match self.asin {
            Some(Value::String(asin)) => Ok(asin),
            None | Some(Value::Null) => Err(ValidationIssue::asin("Required")),
            Some(other) => Err(ValidationIssue::asin(format!(
                "Expected string, received {}",
                json_type(&other)
            ))),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// --- Handlers ---
async fn optimize_handler(
    State(pipeline): State<Pipeline>,
    payload: std::result::Result<Json<OptimizeRequest>, JsonRejection>,
) -> std::result::Result<Json<OptimizationRecord>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "rejected optimize body");
        AppError::Validation(vec![ValidationIssue {
            path: Vec::new(),
            message: rejection.body_text(),
        }])
    })?;
    let asin = request
        .asin()
        .map_err(|issue| AppError::Validation(vec![issue]))?;

    let record = pipeline.optimize(&asin, &SilentProgress).await?;
    Ok(Json(record))
}

async fn history_handler(
    State(pipeline): State<Pipeline>,
) -> std::result::Result<Json<Vec<OptimizationRecord>>, AppError> {
    let records = pipeline.history().await.map_err(|e| {
        tracing::error!(error = %e, "history query failed");
        AppError::Internal("Failed to fetch optimization history".into())
    })?;
    Ok(Json(records))
}

async fn asin_history_handler(
    State(pipeline): State<Pipeline>,
    Path(asin): Path<String>,
) -> std::result::Result<Json<Vec<OptimizationRecord>>, AppError> {
    let asin = asin.to_uppercase();
    let records = pipeline.history_for(&asin).await.map_err(|e| {
        tracing::error!(error = %e, %asin, "asin history query failed");
        AppError::Internal("Failed to fetch ASIN history".into())
    })?;
    Ok(Json(records))
}

// --- Server ---

/// Build the API router over `pipeline`.
pub fn router(pipeline: Pipeline) -> Router {
    Router::new()
        .route("/api/optimize", post(optimize_handler))
        .route("/api/history", get(history_handler))
        .route("/api/history/:asin", get(asin_history_handler))
        .with_state(pipeline)
        .layer(TraceLayer::new_for_http())
}

/// Bind `listen_addr` and serve until Ctrl-C.
pub async fn run_server(listen_addr: &str, pipeline: Pipeline) -> Result<()> {
    let addr: SocketAddr = listen_addr.parse().map_err(|e| {
        ListingForgeError::config(format!("invalid bind address '{listen_addr}': {e}"))
    })?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ListingForgeError::Network(format!("failed to bind {addr}: {e}")))?;
    tracing::info!(%addr, "ListingForge API listening");

    axum::serve(listener, router(pipeline))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutting down gracefully");
        })
        .await
        .map_err(|e| ListingForgeError::Network(format!("server error: {e}")))
}
