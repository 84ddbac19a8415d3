// ABOUTME: HTTP server exposing the guide over JSON.
// ABOUTME: POST /api/chat answers one message; history, health, and Prometheus routes alongside.

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use guide_core::config::HttpConfig;
use guide_core::{metrics, ChatRequest, GuideService};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

/// Largest accepted chat message, in bytes
pub const MAX_MESSAGE_LENGTH: usize = 64 * 1024;

const DEFAULT_HISTORY_LIMIT: usize = 50;
const MAX_HISTORY_LIMIT: usize = 500;

#[derive(Clone)]
struct ApiState {
    service: Arc<GuideService>,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            success: false,
            message: message.into(),
        }),
    )
        .into_response()
}

/// Build the application router
pub fn router(
    service: Arc<GuideService>,
    api_key: Option<String>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let state = ApiState {
        service,
        api_key,
    };

    let api_routes = Router::new()
        .route("/api/chat", post(chat_handler))
        .route(
            "/api/conversations/{conversation_id}/messages",
            get(history_handler),
        )
        .route("/health", get(health_handler))
        .with_state(Arc::new(state));

    // Metrics endpoint - renders Prometheus text format
    let metrics_routes = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(Arc::new(metrics_handle));

    Router::new()
        .merge(api_routes)
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until `shutdown` is cancelled
pub async fn serve(config: &HttpConfig, app: Router, shutdown: CancellationToken) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!(addr = %addr, "Starting guide HTTP server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("HTTP server failed")?;

    tracing::info!("Guide HTTP server stopped");
    Ok(())
}

fn authorized(state: &ApiState, headers: &HeaderMap) -> bool {
    let Some(expected) = &state.api_key else {
        return true;
    };
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|provided| provided == expected)
}

async fn chat_handler(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Response {
    if !authorized(&state, &headers) {
        tracing::warn!(conversation_id = %request.conversation_id, "Chat authentication failed");
        metrics::record_error("http_auth");
        return error_response(StatusCode::UNAUTHORIZED, "Invalid or missing API key");
    }

    if request.user_id.trim().is_empty() || request.conversation_id.trim().is_empty() {
        metrics::record_error("http_bad_request");
        return error_response(
            StatusCode::BAD_REQUEST,
            "user_id and conversation_id are required",
        );
    }

    if request.message.len() > MAX_MESSAGE_LENGTH {
        tracing::warn!(
            conversation_id = %request.conversation_id,
            message_len = request.message.len(),
            "Chat message exceeds size limit"
        );
        metrics::record_error("http_message_too_large");
        return error_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("Message too large (max {} bytes)", MAX_MESSAGE_LENGTH),
        );
    }

    // Dropping this handler (client disconnect) cancels the in-flight stream
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let reply = state.service.respond(request, cancel).await;
    Json(reply).into_response()
}

async fn history_handler(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    if !authorized(&state, &headers) {
        tracing::warn!(conversation_id = %conversation_id, "History authentication failed");
        metrics::record_error("http_auth");
        return error_response(StatusCode::UNAUTHORIZED, "Invalid or missing API key");
    }

    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    match state.service.store().conversation(&conversation_id, limit).await {
        Ok(messages) => Json(messages).into_response(),
        Err(e) => {
            tracing::error!(error = %e, conversation_id = %conversation_id, "Failed to load conversation");
            metrics::record_error("store");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load conversation")
        }
    }
}

async fn health_handler(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "runtime": state.service.runtime_name(),
    }))
}

async fn metrics_handler(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}
