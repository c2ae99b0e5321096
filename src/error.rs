// Error handling module
// Defines error types and HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors raised while obtaining an access token from the identity provider
#[derive(Error, Debug)]
pub enum AuthError {
    /// One or more credential fields are empty; no request was attempted
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    /// The token request could not be sent or its body could not be read
    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The identity provider answered with a non-2xx status
    #[error("token endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The token response was not the expected JSON shape
    #[error("malformed token response: {0}")]
    Malformed(String),
}

impl AuthError {
    /// Configuration problems are surfaced before any network I/O
    pub fn is_configuration(&self) -> bool {
        matches!(self, AuthError::MissingCredentials(_))
    }
}

/// API errors that can occur during request processing
#[derive(Error, Debug)]
pub enum ApiError {
    /// Credential manager could not produce a token
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Error status from the Power BI API
    #[error("Power BI API error: {status} - {message}")]
    PowerBi { status: u16, message: String },

    /// Request could not be delivered (connect, timeout, body)
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body was not valid JSON
    #[error("Invalid JSON response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Response JSON was missing an expected field
    #[error("Unexpected response shape: missing {0}")]
    UnexpectedShape(String),

    /// The query engine reported an error inside a 200 response
    #[error("DAX query failed: {0}")]
    QueryFailed(String),

    /// Caller presented an invalid or missing gateway API key
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Tool dispatch received an unknown tool name
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Request validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            ApiError::UnknownTool(_) => (StatusCode::NOT_FOUND, "unknown_tool", self.to_string()),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error", self.to_string()),
            ApiError::PowerBi { status, message } => {
                let status_code =
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status_code, "powerbi_api_error", message.clone())
            }
            ApiError::Auth(_) => (StatusCode::BAD_GATEWAY, "auth_error", self.to_string()),
            ApiError::Transport(_)
            | ApiError::Decode(_)
            | ApiError::UnexpectedShape(_)
            | ApiError::QueryFailed(_) => {
                (StatusCode::BAD_GATEWAY, "upstream_error", self.to_string())
            }
            ApiError::Internal(err) => {
                tracing::error!("Internal error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": message,
                "type": error_type,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, ApiError>;
