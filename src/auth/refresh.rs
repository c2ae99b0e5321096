// Client-credentials token exchange

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::Client;

use super::types::{
    Credentials, TokenData, TokenResponse, DEFAULT_EXPIRES_IN, EXPIRY_MARGIN_SECS, POWERBI_SCOPE,
};
use crate::error::AuthError;

/// Get the OAuth2 v2.0 token endpoint for a tenant
pub fn token_url(authority: &str, tenant_id: &str) -> String {
    format!(
        "{}/{}/oauth2/v2.0/token",
        authority.trim_end_matches('/'),
        tenant_id
    )
}

/// Expiry recorded for a token issued at `now` with the given lifetime
///
/// A lifetime that does not fit a timestamp is a malformed response.
pub(crate) fn expiry_from(now: DateTime<Utc>, expires_in: u64) -> Result<DateTime<Utc>, AuthError> {
    i64::try_from(expires_in)
        .ok()
        .and_then(|secs| secs.checked_sub(EXPIRY_MARGIN_SECS))
        .and_then(TimeDelta::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| AuthError::Malformed(format!("expires_in out of range: {}", expires_in)))
}

/// Exchange the service principal's id and secret for an access token
pub async fn exchange_client_credentials(
    client: &Client,
    authority: &str,
    creds: &Credentials,
) -> Result<TokenData, AuthError> {
    let url = token_url(authority, &creds.tenant_id);

    tracing::info!("Requesting Power BI access token via client credentials...");
    tracing::debug!(
        "Token request: url={}, client_id={}...",
        url,
        creds.client_id.chars().take(8).collect::<String>()
    );

    let form = [
        ("client_id", creds.client_id.as_str()),
        ("client_secret", creds.client_secret.as_str()),
        ("scope", POWERBI_SCOPE),
        ("grant_type", "client_credentials"),
    ];

    let response = client.post(&url).form(&form).send().await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::error!("Token request failed: status={}, body={}", status, body);

        // Azure AD puts the useful part in error_description
        if let Ok(error_json) = serde_json::from_str::<serde_json::Value>(&body) {
            if let (Some(error_code), Some(error_desc)) = (
                error_json.get("error").and_then(|v| v.as_str()),
                error_json.get("error_description").and_then(|v| v.as_str()),
            ) {
                tracing::error!(
                    "Token error details: error={}, description={}",
                    error_code,
                    error_desc
                );
            }
        }

        return Err(AuthError::Rejected {
            status: status.as_u16(),
            body,
        });
    }

    let data: TokenResponse =
        serde_json::from_str(&body).map_err(|e| AuthError::Malformed(e.to_string()))?;

    if data.access_token.is_empty() {
        return Err(AuthError::Malformed(
            "response does not contain access_token".to_string(),
        ));
    }

    let expires_at = expiry_from(Utc::now(), data.expires_in.unwrap_or(DEFAULT_EXPIRES_IN))?;

    tracing::info!("Access token obtained, expires: {}", expires_at.to_rfc3339());

    Ok(TokenData {
        access_token: data.access_token,
        expires_at,
    })
}
