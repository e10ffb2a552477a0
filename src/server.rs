//!
//! sqlchat HTTP server
//! -------------------
//! Axum-based JSON API over a `SessionRegistry`. Each request locks only the session
//! it names; catalog work runs on the blocking pool so the async executor is never
//! held by a query.
//!
//! Routes:
//! - `GET /` health
//! - `POST /sessions` create a session (optional `SessionConfig` body)
//! - `PUT /sessions/{id}/data?name=<file>` upload the dataset (raw body)
//! - `DELETE /sessions/{id}/data` remove the dataset
//! - `POST /sessions/{id}/query` submit one input
//! - `GET /sessions/{id}/tables`, `GET /sessions/{id}/history`
//! - `DELETE /sessions/{id}` drop the session

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use futures_util::FutureExt; // for catch_unwind on async blocks
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::config::{RowLimit, ServerConfig, SessionConfig};
use crate::error::{AppError, AppResult};
use crate::exec::QueryOutput;
use crate::service::{SessionRegistry, Submission};

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(default_config: SessionConfig) -> Self {
        Self { registry: Arc::new(SessionRegistry::new(default_config)) }
    }
}

type ApiResponse = (StatusCode, Json<serde_json::Value>);

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct QueryPayload {
    pub query: String,
    #[serde(default)]
    pub row_limit: Option<i64>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "sqlchat ok" }))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", axum::routing::delete(delete_session))
        .route("/sessions/{id}/data", put(upload_data).delete(remove_data))
        .route("/sessions/{id}/query", post(query_handler))
        .route("/sessions/{id}/tables", get(tables_handler))
        .route("/sessions/{id}/history", get(history_handler))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn run(server: ServerConfig, default_config: SessionConfig) -> anyhow::Result<()> {
    let app = router(AppState::new(default_config));
    let addr: SocketAddr = format!("{}:{}", server.bind, server.http_port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", server.bind, server.http_port))?;
    info!(target: "sqlchat::server", "Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub(crate) fn error_response(e: &AppError) -> ApiResponse {
    let status = StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::UNPROCESSABLE_ENTITY);
    (status, Json(json!({"status":"error","code": e.code_str(),"message": e.to_string()})))
}

// Run catalog work off the async executor; a panic becomes a 500.
async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    let fut = tokio::task::spawn_blocking(f);
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(res)) => res,
        Ok(Err(join_err)) => {
            error!(target: "panic", "HTTP handler task failed: {}", join_err);
            Err(AppError::internal("internal server error"))
        }
        Err(_) => {
            error!(target: "panic", "HTTP handler panic");
            Err(AppError::internal("internal server error"))
        }
    }
}

fn respond(result: AppResult<serde_json::Value>) -> ApiResponse {
    match result {
        Ok(value) => (StatusCode::OK, Json(json!({"status":"ok","results": value}))),
        Err(e) => error_response(&e),
    }
}

async fn create_session(State(state): State<AppState>, body: Bytes) -> ApiResponse {
    let config = if body.iter().all(|b| b.is_ascii_whitespace()) {
        None
    } else {
        match serde_json::from_slice::<SessionConfig>(&body) {
            Ok(c) => Some(c),
            Err(e) => {
                return (StatusCode::BAD_REQUEST, Json(json!({"status":"error","code":"invalid_config","message": e.to_string()})));
            }
        }
    };
    let id = state.registry.create(config);
    (StatusCode::CREATED, Json(json!({"status":"ok","session_id": id.to_string()})))
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> ApiResponse {
    respond(state.registry.remove(&id).map(|_| json!({"removed": id})))
}

async fn upload_data(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> ApiResponse {
    let session = match state.registry.get(&id) {
        Ok(s) => s,
        Err(e) => return error_response(&e),
    };
    respond(
        blocking(move || {
            let report = session.lock().load_source(&params.name, &body)?;
            serde_json::to_value(report).map_err(|e| AppError::internal(e.to_string()))
        })
        .await,
    )
}

async fn remove_data(State(state): State<AppState>, Path(id): Path<String>) -> ApiResponse {
    let session = match state.registry.get(&id) {
        Ok(s) => s,
        Err(e) => return error_response(&e),
    };
    respond(
        blocking(move || {
            let mut guard = session.lock();
            guard.unload();
            serde_json::to_value(guard.current_tables()).map_err(|e| AppError::internal(e.to_string()))
        })
        .await,
    )
}

async fn query_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<QueryPayload>,
) -> ApiResponse {
    let session = match state.registry.get(&id) {
        Ok(s) => s,
        Err(e) => return error_response(&e),
    };
    let result = blocking(move || {
        let mut guard = session.lock();
        let sub = guard.submit(&payload.query, payload.row_limit.map(RowLimit::new));
        let tables = guard.current_tables();
        Ok((sub, tables))
    })
    .await;
    match result {
        Ok((sub, tables)) => {
            let body = submission_json(&sub, &tables);
            match &sub.outcome {
                Ok(_) => (StatusCode::OK, Json(body)),
                Err(e) => {
                    let status = StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::UNPROCESSABLE_ENTITY);
                    (status, Json(body))
                }
            }
        }
        Err(e) => error_response(&e),
    }
}

async fn tables_handler(State(state): State<AppState>, Path(id): Path<String>) -> ApiResponse {
    respond(
        state
            .registry
            .get(&id)
            .and_then(|s| serde_json::to_value(s.lock().current_tables()).map_err(|e| AppError::internal(e.to_string()))),
    )
}

async fn history_handler(State(state): State<AppState>, Path(id): Path<String>) -> ApiResponse {
    respond(
        state
            .registry
            .get(&id)
            .and_then(|s| serde_json::to_value(s.lock().transcript()).map_err(|e| AppError::internal(e.to_string()))),
    )
}

fn submission_json(sub: &Submission, tables: &crate::session::TablesSnapshot) -> serde_json::Value {
    let warnings: Vec<String> = sub.warnings.iter().map(|w| w.to_string()).collect();
    let mut body = json!({
        "raw": sub.raw,
        "rewritten": sub.rewritten,
        "classification": sub.classification,
        "elapsed_seconds": sub.elapsed.and_then(|e| e.seconds()),
        "warnings": warnings,
        "tables": tables,
    });
    match &sub.outcome {
        Ok(QueryOutput::Table(rs)) => {
            let (columns, rows) = rs.to_tabular();
            body["status"] = json!("ok");
            body["results"] = json!({"columns": columns, "rows": rows});
        }
        Ok(QueryOutput::Explain(pairs)) => {
            let rows: Vec<serde_json::Value> = pairs.iter().map(|(k, v)| json!({"key": k, "value": v})).collect();
            body["status"] = json!("ok");
            body["results"] = json!({"explain": rows});
        }
        Err(e) => {
            body["status"] = json!("error");
            body["code"] = json!(e.code_str());
            body["message"] = json!(e.to_string());
        }
    }
    body
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod server_tests;
