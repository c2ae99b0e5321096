// Caller authentication and CORS middleware

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use tower_http::cors::{Any, CorsLayer};

use crate::error::ApiError;
use crate::routes::AppState;

/// Authentication middleware
///
/// With no gateway API key configured every request passes. Otherwise the key
/// must arrive as "Bearer {GATEWAY_API_KEY}" or in the x-api-key header.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected_key) = state.api_key.as_deref() else {
        return Ok(next.run(request).await);
    };

    if let Some(auth_header) = request.headers().get("authorization") {
        if let Ok(auth_str) = auth_header.to_str() {
            if auth_str.strip_prefix("Bearer ") == Some(expected_key) {
                return Ok(next.run(request).await);
            }
        }
    }

    if let Some(api_key_header) = request.headers().get("x-api-key") {
        if let Ok(key_str) = api_key_header.to_str() {
            if key_str == expected_key {
                return Ok(next.run(request).await);
            }
        }
    }

    let request_id = uuid::Uuid::new_v4().to_string()[..8].to_string();
    tracing::warn!(
        "[{}] Access attempt with invalid or missing API key: {} {}",
        request_id,
        request.method(),
        request.uri().path()
    );
    Err(ApiError::Unauthorized(
        "Invalid or missing API Key".to_string(),
    ))
}

/// Create CORS middleware layer
///
/// Allows all origins, methods, and headers; preflight handled by the layer.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
