use anyhow::Context;
use reqwest::{header, Client, Method, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::auth::CredentialManager;
use crate::config::GatewaySettings;
use crate::error::{ApiError, Result};

/// Authenticated HTTP client for the Power BI REST API
///
/// No retries: every failure is returned to the caller as-is.
pub struct PowerBiHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Token source for the Authorization header
    credentials: CredentialManager,

    /// REST root, without trailing slash
    base_url: String,
}

impl PowerBiHttpClient {
    /// Create a new HTTP client and the credential manager it owns
    pub fn new(settings: &GatewaySettings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(settings.http_connect_timeout))
            .timeout(Duration::from_secs(settings.http_request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        let credentials = CredentialManager::new(
            settings.credentials.clone(),
            settings.authority_url.clone(),
            client.clone(),
        );

        Ok(Self {
            client,
            credentials,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Absolute URL for a path such as `/groups`
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    /// Send an authenticated request and decode the JSON response body
    ///
    /// An empty 2xx body decodes as `null`.
    pub async fn authenticated_request<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        query: &[(&str, String)],
    ) -> Result<Value>
    where
        B: Serialize + ?Sized,
    {
        let response = self.send(method, path, body, query).await?;
        let bytes = response.bytes().await?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send an authenticated request when only the status code matters
    pub async fn authenticated_status<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<StatusCode>
    where
        B: Serialize + ?Sized,
    {
        let response = self.send(method, path, body, &[]).await?;
        Ok(response.status())
    }

    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        self.authenticated_request::<Value>(Method::GET, path, None, query)
            .await
    }

    pub async fn post_json<B>(&self, path: &str, body: &B) -> Result<Value>
    where
        B: Serialize + ?Sized,
    {
        self.authenticated_request(Method::POST, path, Some(body), &[])
            .await
    }

    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        query: &[(&str, String)],
    ) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let token = self.credentials.ensure_valid_token().await?;
        let url = self.url_for(path);

        tracing::debug!(
            method = %method,
            url = %url,
            "Sending Power BI request"
        );

        let mut builder = self
            .client
            .request(method.clone(), &url)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/json");

        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                // Categorize the error for better debugging
                let error_kind = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connection_failed"
                } else if e.is_request() {
                    "request_error"
                } else if e.is_body() {
                    "body_error"
                } else {
                    "unknown"
                };

                tracing::warn!(
                    error_kind = error_kind,
                    error = %e,
                    method = %method,
                    url = %url,
                    "Power BI request error"
                );
                return Err(ApiError::Transport(e));
            }
        };

        let status = response.status();
        tracing::debug!(status = %status, "Received Power BI response");

        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        tracing::error!(
            status = status.as_u16(),
            method = %method,
            url = %url,
            response_body = %error_text,
            "Power BI request failed with error response"
        );

        Err(ApiError::PowerBi {
            status: status.as_u16(),
            message: error_text,
        })
    }
}
