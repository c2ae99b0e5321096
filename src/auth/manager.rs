use chrono::{DateTime, Utc};
use reqwest::Client;
use tokio::sync::RwLock;

use super::refresh;
use super::types::{Credentials, TokenState};
use crate::error::AuthError;

/// Credential manager
/// Owns one service principal credential and the token issued for it
pub struct CredentialManager {
    /// Service principal identity (never mutated)
    credentials: Credentials,

    /// Current token and expiry
    token: RwLock<TokenState>,

    /// Identity provider authority, e.g. https://login.microsoftonline.com
    authority_url: String,

    /// HTTP client for token requests
    client: Client,
}

impl CredentialManager {
    /// Create a manager with no token; the first call to
    /// [`ensure_valid_token`](Self::ensure_valid_token) performs the exchange
    pub fn new(credentials: Credentials, authority_url: impl Into<String>, client: Client) -> Self {
        Self {
            credentials,
            token: RwLock::new(TokenState::default()),
            authority_url: authority_url.into(),
            client,
        }
    }

    /// Get a valid access token, exchanging credentials if necessary
    ///
    /// Tasks that wait behind an in-flight refresh re-check the token once
    /// they hold the write lock, so they reuse the fresh one.
    pub async fn ensure_valid_token(&self) -> Result<String, AuthError> {
        let missing = self.credentials.missing_fields();
        if !missing.is_empty() {
            tracing::error!("Missing authentication credentials: {}", missing.join(", "));
            return Err(AuthError::MissingCredentials(missing.join(", ")));
        }

        {
            let state = self.token.read().await;
            if let Some(token) = state.valid_token(Utc::now()) {
                return Ok(token.to_string());
            }
        }

        let mut state = self.token.write().await;
        if let Some(token) = state.valid_token(Utc::now()) {
            return Ok(token.to_string());
        }

        tracing::debug!("Access token missing or expired, refreshing...");
        let token_data =
            refresh::exchange_client_credentials(&self.client, &self.authority_url, &self.credentials)
                .await?;

        state.access_token = Some(token_data.access_token.clone());
        state.expires_at = Some(token_data.expires_at);

        Ok(token_data.access_token)
    }

    /// Recorded expiry of the current token, if any
    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.token.read().await.expires_at
    }

    /// Tenant this manager authenticates against
    pub fn tenant_id(&self) -> &str {
        &self.credentials.tenant_id
    }

    #[cfg(test)]
    async fn seed(&self, access_token: &str, expires_at: DateTime<Utc>) {
        let mut state = self.token.write().await;
        state.access_token = Some(access_token.to_string());
        state.expires_at = Some(expires_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const TOKEN_PATH: &str = "/tenant-1/oauth2/v2.0/token";

    fn manager_for(server: &mockito::Server, credentials: Credentials) -> CredentialManager {
        CredentialManager::new(credentials, server.url(), Client::new())
    }

    fn valid_credentials() -> Credentials {
        Credentials::new("tenant-1", "client-1", "secret-1")
    }

    #[tokio::test]
    async fn test_cached_token_skips_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .with_status(200)
            .with_body(r#"{"access_token":"tok-1","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let manager = manager_for(&server, valid_credentials());
        let first = manager.ensure_valid_token().await.unwrap();
        let second = manager.ensure_valid_token().await.unwrap();

        mock.assert_async().await;
        assert_eq!(first, "tok-1");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_expired_token_refreshes_once() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .with_status(200)
            .with_body(r#"{"access_token":"tok-new","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let manager = manager_for(&server, valid_credentials());
        let stale_expiry = Utc::now() - Duration::seconds(1);
        manager.seed("tok-old", stale_expiry).await;

        let token = manager.ensure_valid_token().await.unwrap();

        mock.assert_async().await;
        assert_eq!(token, "tok-new");
        let expiry = manager.expires_at().await.unwrap();
        assert!(expiry > Utc::now() + Duration::seconds(3000));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .with_status(200)
            .with_body(r#"{"access_token":"tok-shared","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let manager = manager_for(&server, valid_credentials());
        manager.seed("tok-old", Utc::now() - Duration::seconds(1)).await;

        let (a, b, c, d) = tokio::join!(
            manager.ensure_valid_token(),
            manager.ensure_valid_token(),
            manager.ensure_valid_token(),
            manager.ensure_valid_token(),
        );

        mock.assert_async().await;
        for token in [a, b, c, d] {
            assert_eq!(token.unwrap(), "tok-shared");
        }
    }

    #[tokio::test]
    async fn test_valid_seeded_token_is_returned() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .expect(0)
            .create_async()
            .await;

        let manager = manager_for(&server, valid_credentials());
        manager.seed("tok-live", Utc::now() + Duration::seconds(600)).await;

        assert_eq!(manager.ensure_valid_token().await.unwrap(), "tok-live");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_credentials_no_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        for creds in [
            Credentials::new("", "client-1", "secret-1"),
            Credentials::new("tenant-1", "", "secret-1"),
            Credentials::new("tenant-1", "client-1", ""),
        ] {
            let manager = manager_for(&server, creds);
            let err = manager.ensure_valid_token().await.unwrap_err();
            assert!(err.is_configuration());
            assert!(err.to_string().contains("missing credentials"));
        }

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_no_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .with_status(400)
            .with_body(r#"{"error":"unauthorized_client"}"#)
            .expect(2)
            .create_async()
            .await;

        let manager = manager_for(&server, valid_credentials());
        assert!(matches!(
            manager.ensure_valid_token().await,
            Err(AuthError::Rejected { status: 400, .. })
        ));
        // No retry inside a call; the next call tries again
        assert!(manager.ensure_valid_token().await.is_err());
        assert!(manager.expires_at().await.is_none());

        mock.assert_async().await;
    }
}
