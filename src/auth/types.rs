// Authentication types

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// Identity provider authority used when none is configured
pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";

/// Scope requested for the Power BI REST API
pub const POWERBI_SCOPE: &str = "https://analysis.windows.net/powerbi/api/.default";

/// Lifetime assumed when the token response omits `expires_in`
pub const DEFAULT_EXPIRES_IN: u64 = 3600;

/// Seconds shaved off every token lifetime so a token never expires mid-request
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// Service principal credentials, fixed for the lifetime of a gateway
#[derive(Clone, Default)]
pub struct Credentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Names of the fields that are empty, in declaration order
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.tenant_id.trim().is_empty() {
            missing.push("tenant_id");
        }
        if self.client_id.trim().is_empty() {
            missing.push("client_id");
        }
        if self.client_secret.trim().is_empty() {
            missing.push("client_secret");
        }
        missing
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Mutable half of the credential: the current token and its expiry
#[derive(Debug, Clone, Default)]
pub struct TokenState {
    pub access_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenState {
    /// Token is usable only while `now` is strictly before the recorded expiry
    pub fn valid_token(&self, now: DateTime<Utc>) -> Option<&str> {
        match (&self.access_token, self.expires_at) {
            (Some(token), Some(exp)) if now < exp => Some(token.as_str()),
            _ => None,
        }
    }
}

/// Token data from a successful exchange
#[derive(Debug, Clone)]
pub struct TokenData {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// OAuth2 token endpoint response
#[derive(Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    pub expires_in: Option<u64>,
}
