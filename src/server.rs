//! HTTP front end
//!
//! Routes:
//! - `GET /sub/{id}`: multi-SNI subscription as plain text. Failures are
//!   reported in the body as `Error: ...`, subscription clients have no
//!   other error channel.
//! - `GET /debug-sni-list`: first entries of the shared whitelist
//! - `GET /reload-whitelist`: refresh the shared whitelist
//! - `GET /health`

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::generator::Generator;

/// Number of whitelist entries shown by the debug endpoint
const DEBUG_SNI_PREVIEW: usize = 10;

#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<Generator>,
}

/// Builds the router
pub fn router(generator: Arc<Generator>) -> Router {
    Router::new()
        .route("/sub/{id}", get(multi_subscription))
        .route("/debug-sni-list", get(debug_sni_list))
        .route("/reload-whitelist", get(reload_whitelist))
        .route("/health", get(health))
        .with_state(AppState { generator })
}

/// Binds the configured address and serves until the process is stopped
pub async fn serve(generator: Generator) -> Result<()> {
    let addr = generator.config().listen_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, router(Arc::new(generator)))
        .await
        .context("HTTP server error")
}

fn plain_text(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

async fn multi_subscription(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    info!("Subscription request for '{}'", id);
    match state.generator.generate(&id).await {
        Ok(body) => plain_text(body),
        Err(e) => {
            error!("Subscription '{}' failed: {}", id, e);
            plain_text(e.to_client_message())
        }
    }
}

async fn debug_sni_list(State(state): State<AppState>) -> Response {
    match state.generator.whitelist().current().await {
        Ok(list) => Json(json!({
            "status": "success",
            "sni_count": list.len(),
            "sni_list": list.iter().take(DEBUG_SNI_PREVIEW).collect::<Vec<_>>(),
        }))
        .into_response(),
        Err(e) => internal_error(e.to_string()),
    }
}

async fn reload_whitelist(State(state): State<AppState>) -> Response {
    match state.generator.whitelist().reload().await {
        Ok((list, origin)) => {
            info!("Whitelist reloaded: {} domains from {}", list.len(), origin);
            Json(json!({
                "status": "success",
                "message": "Whitelist reloaded successfully",
                "domains_loaded": list.len(),
                "source": origin.to_string(),
            }))
            .into_response()
        }
        Err(e) => internal_error(e.to_string()),
    }
}

async fn health() -> &'static str {
    "ok"
}

fn internal_error(detail: String) -> Response {
    error!("Request failed: {}", detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": detail })),
    )
        .into_response()
}
