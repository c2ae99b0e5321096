use axum::{
    body::Bytes,
    extract::{Path, State},
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::ApiError;
use crate::gateway::PowerBiGateway;
use crate::middleware;
use crate::tools::{self, TOOL_NAMES};

/// Application version from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<PowerBiGateway>,
    pub api_key: Option<String>,
}

/// Health check routes (no authentication required)
pub fn health_routes() -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
}

/// Tool routes (API key checked when one is configured)
pub fn tool_routes(state: AppState) -> Router {
    Router::new()
        .route("/tools", get(list_tools_handler))
        .route("/tools/:name", post(call_tool_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .with_state(state)
}

/// GET / - Simple health check
async fn root_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Power BI Gateway is running",
        "version": VERSION
    }))
}

/// GET /health - Detailed health check
async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "version": VERSION
    }))
}

/// GET /tools - Names of the callable tools
async fn list_tools_handler() -> Json<Value> {
    Json(json!({ "tools": TOOL_NAMES }))
}

/// POST /tools/{name} - Invoke a tool
///
/// The body is the tool's argument object (may be empty). The envelope is
/// returned with 200 whether or not the operation succeeded.
async fn call_tool_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    tracing::info!("Request to /tools/{}", name);

    let args = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::Validation(format!("request body is not JSON: {}", e)))?
    };

    let envelope = tools::dispatch(&state.gateway, &name, args).await?;
    Ok(Json(envelope))
}
