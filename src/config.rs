use anyhow::{Context, Result};
use clap::Parser;

use crate::auth::{Credentials, DEFAULT_AUTHORITY_URL};

/// Power BI REST root used when none is configured
pub const DEFAULT_BASE_URL: &str = "https://api.powerbi.com/v1.0/myorg";

/// Power BI Gateway - authenticated tool surface for the Power BI REST API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Server host address
    #[arg(short = 'H', long, env = "SERVER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Server port
    #[arg(short, long, env = "SERVER_PORT", default_value = "8000")]
    pub port: u16,

    /// API key callers must present; open access when unset
    #[arg(short = 'k', long, env = "GATEWAY_API_KEY")]
    pub api_key: Option<String>,

    /// Azure AD tenant of the service principal
    #[arg(long, env = "POWERBI_TENANT_ID", default_value = "")]
    pub tenant_id: String,

    /// Application (client) id of the service principal
    #[arg(long, env = "POWERBI_CLIENT_ID", default_value = "")]
    pub client_id: String,

    /// Client secret of the service principal
    #[arg(long, env = "POWERBI_CLIENT_SECRET", default_value = "", hide_env_values = true)]
    pub client_secret: String,

    /// Power BI REST base URL
    #[arg(long, env = "POWERBI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Identity provider authority
    #[arg(long, env = "POWERBI_AUTHORITY_URL", default_value = DEFAULT_AUTHORITY_URL)]
    pub authority_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value = "30")]
    pub connect_timeout: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "120")]
    pub http_timeout: u64,
}

/// Everything needed to build one gateway instance
#[derive(Clone, Debug)]
pub struct GatewaySettings {
    pub credentials: Credentials,
    pub base_url: String,
    pub authority_url: String,
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,
}

impl GatewaySettings {
    /// Settings pointing at the public Power BI and Azure AD endpoints
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            base_url: DEFAULT_BASE_URL.to_string(),
            authority_url: DEFAULT_AUTHORITY_URL.to_string(),
            http_connect_timeout: 30,
            http_request_timeout: 120,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_authority_url(mut self, authority_url: impl Into<String>) -> Self {
        self.authority_url = authority_url.into();
        self
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    // Server settings
    pub server_host: String,
    pub server_port: u16,

    // Caller authentication
    pub gateway_api_key: Option<String>,

    // Upstream
    pub gateway: GatewaySettings,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > .env > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        Ok(Self::from_args(args))
    }

    pub fn from_args(args: CliArgs) -> Self {
        let credentials = Credentials::new(args.tenant_id, args.client_id, args.client_secret);

        Config {
            server_host: args.host,
            server_port: args.port,
            gateway_api_key: args.api_key.filter(|key| !key.is_empty()),
            gateway: GatewaySettings {
                credentials,
                base_url: args.base_url,
                authority_url: args.authority_url,
                http_connect_timeout: args.connect_timeout,
                http_request_timeout: args.http_timeout,
            },
            log_level: args.log_level,
        }
    }

    /// Validate configuration
    ///
    /// Missing credentials are not fatal here: every operation reports them
    /// in its envelope instead.
    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.gateway.base_url)
            .with_context(|| format!("POWERBI_BASE_URL is not a valid URL: {}", self.gateway.base_url))?;
        reqwest::Url::parse(&self.gateway.authority_url).with_context(|| {
            format!(
                "POWERBI_AUTHORITY_URL is not a valid URL: {}",
                self.gateway.authority_url
            )
        })?;

        if self.gateway.http_request_timeout == 0 {
            anyhow::bail!("HTTP_REQUEST_TIMEOUT must be greater than zero");
        }

        let missing = self.gateway.credentials.missing_fields();
        if !missing.is_empty() {
            tracing::warn!(
                "Power BI credentials incomplete (missing: {}); operations will fail until they are set",
                missing.join(", ")
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["powerbi-gateway"];
        argv.extend_from_slice(args);
        Config::from_args(CliArgs::parse_from(argv))
    }

    #[test]
    fn test_cli_overrides() {
        let config = parse(&[
            "--tenant-id",
            "t",
            "--client-id",
            "c",
            "--client-secret",
            "s",
            "--base-url",
            "http://localhost:9000/v1.0/myorg",
            "--port",
            "9001",
        ]);
        assert_eq!(config.server_port, 9001);
        assert_eq!(config.gateway.base_url, "http://localhost:9000/v1.0/myorg");
        assert!(config.gateway.credentials.missing_fields().is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_api_key_means_open_access() {
        let config = parse(&["--api-key", ""]);
        assert!(config.gateway_api_key.is_none());
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let config = parse(&["--base-url", "not a url"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_settings_builder() {
        let settings = GatewaySettings::new(Credentials::new("t", "c", "s"))
            .with_base_url("http://127.0.0.1:1")
            .with_authority_url("http://127.0.0.1:2");
        assert_eq!(settings.base_url, "http://127.0.0.1:1");
        assert_eq!(settings.authority_url, "http://127.0.0.1:2");
        assert_eq!(
            GatewaySettings::new(Credentials::default()).base_url,
            DEFAULT_BASE_URL
        );
    }
}
