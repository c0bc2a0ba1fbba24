//! Configuration management for the Teams client.
//!
//! Supports configuration via:
//! - Explicit values
//! - Environment variables
//! - Builder pattern

use crate::error::{ConfigurationError, TeamsResult};
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Configuration for the Teams integration
#[derive(Clone)]
pub struct TeamsConfig {
    /// Azure AD tenant (directory) ID
    pub tenant_id: String,
    /// Public client application ID
    pub client_id: String,
    /// Identity platform authority, without the tenant segment
    pub authority: String,
    /// Graph API base URL, including the version segment
    pub graph_base_url: String,
    /// Scopes requested at login and on refresh
    pub scopes: Vec<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Refresh this long before the token expires
    pub skew_buffer: Duration,
    /// Where the CLI persists tokens
    pub token_file: Option<PathBuf>,
    /// Team used by `send` when none is given
    pub default_team_id: Option<String>,
    /// Channel used by `send` when none is given
    pub default_channel_id: Option<String>,
    /// Incoming Webhook URL for the webhook notifier
    pub webhook_url: Option<SecretString>,
}

impl std::fmt::Debug for TeamsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeamsConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &redact_client_id(&self.client_id))
            .field("authority", &self.authority)
            .field("graph_base_url", &self.graph_base_url)
            .field("scopes", &self.scopes)
            .field("timeout", &self.timeout)
            .field("skew_buffer", &self.skew_buffer)
            .field("token_file", &self.token_file)
            .field("default_team_id", &self.default_team_id)
            .field("default_channel_id", &self.default_channel_id)
            .field("webhook_url", &self.webhook_url.is_some())
            .finish()
    }
}

impl Default for TeamsConfig {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            client_id: String::new(),
            authority: crate::DEFAULT_AUTHORITY.to_string(),
            graph_base_url: crate::DEFAULT_GRAPH_BASE_URL.to_string(),
            scopes: crate::DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(crate::DEFAULT_TIMEOUT_SECS),
            skew_buffer: Duration::from_secs(crate::DEFAULT_SKEW_BUFFER_SECS),
            token_file: None,
            default_team_id: None,
            default_channel_id: None,
            webhook_url: None,
        }
    }
}

impl TeamsConfig {
    /// Create a new configuration builder
    pub fn builder() -> TeamsConfigBuilder {
        TeamsConfigBuilder::new()
    }

    /// Create configuration from environment variables
    pub fn from_env() -> TeamsResult<Self> {
        TeamsConfigBuilder::from_lookup(|key| std::env::var(key).ok())?.build()
    }

    /// Device authorization endpoint for the configured tenant
    pub fn device_code_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/devicecode", self.tenant_base())
    }

    /// Token endpoint for the configured tenant
    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.tenant_base())
    }

    /// Scopes as a single space-separated string
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }

    /// Build the full URL for a Graph path
    pub fn graph_url(&self, path: &str) -> String {
        let base = self.graph_base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    fn tenant_base(&self) -> String {
        format!("{}/{}", self.authority.trim_end_matches('/'), self.tenant_id)
    }

    /// Validate the configuration
    pub fn validate(&self) -> TeamsResult<()> {
        if self.tenant_id.trim().is_empty() {
            return Err(ConfigurationError::MissingRequired {
                field: "tenant_id".to_string(),
            }
            .into());
        }

        if self.client_id.trim().is_empty() {
            return Err(ConfigurationError::MissingRequired {
                field: "client_id".to_string(),
            }
            .into());
        }

        for (field, value) in [
            ("authority", &self.authority),
            ("graph_base_url", &self.graph_base_url),
        ] {
            if Url::parse(value).is_err() {
                return Err(ConfigurationError::InvalidUrl {
                    field: field.to_string(),
                    url: value.clone(),
                }
                .into());
            }
        }

        if self.timeout.is_zero() {
            return Err(ConfigurationError::InvalidValue {
                field: "timeout".to_string(),
                message: "must be greater than zero".to_string(),
            }
            .into());
        }

        if self.scopes.is_empty() {
            return Err(ConfigurationError::MissingRequired {
                field: "scopes".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Show only the first characters of the client id.
fn redact_client_id(client_id: &str) -> String {
    if client_id.chars().count() <= 8 {
        client_id.to_string()
    } else {
        let prefix: String = client_id.chars().take(8).collect();
        format!("{}...", prefix)
    }
}

/// Builder for TeamsConfig
#[derive(Default)]
pub struct TeamsConfigBuilder {
    config: TeamsConfig,
}

impl TeamsConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: TeamsConfig::default(),
        }
    }

    /// Populate a builder from `MSTEAMS_*` variables resolved by `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::new();

        if let Some(tenant) = lookup("MSTEAMS_TENANT_ID") {
            builder = builder.tenant_id(tenant);
        }
        if let Some(client) = lookup("MSTEAMS_CLIENT_ID") {
            builder = builder.client_id(client);
        }
        if let Some(authority) = lookup("MSTEAMS_AUTHORITY") {
            builder = builder.authority(authority);
        }
        if let Some(base) = lookup("MSTEAMS_GRAPH_BASE_URL") {
            builder = builder.graph_base_url(base);
        }

        if let Some(timeout) = lookup("MSTEAMS_TIMEOUT") {
            let secs = timeout
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigurationError::InvalidValue {
                    field: "MSTEAMS_TIMEOUT".to_string(),
                    message: e.to_string(),
                })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }

        if let Some(path) = lookup("MSTEAMS_TOKEN_FILE") {
            builder = builder.token_file(path);
        }
        if let Some(team) = lookup("MSTEAMS_DEFAULT_TEAM_ID") {
            builder = builder.default_team_id(team);
        }
        if let Some(channel) = lookup("MSTEAMS_DEFAULT_CHANNEL_ID") {
            builder = builder.default_channel_id(channel);
        }
        if let Some(webhook) = lookup("MSTEAMS_WEBHOOK_URL") {
            builder = builder.webhook_url(webhook)?;
        }

        Ok(builder)
    }

    /// Populate a builder from the process environment.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Set the tenant ID
    pub fn tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.config.tenant_id = tenant_id.into();
        self
    }

    /// Set the client ID
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.client_id = client_id.into();
        self
    }

    /// Set the identity authority
    pub fn authority(mut self, authority: impl Into<String>) -> Self {
        self.config.authority = authority.into();
        self
    }

    /// Set the Graph base URL
    pub fn graph_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.graph_base_url = url.into();
        self
    }

    /// Replace the requested scopes
    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the refresh skew buffer
    pub fn skew_buffer(mut self, skew: Duration) -> Self {
        self.config.skew_buffer = skew;
        self
    }

    /// Set the token file path
    pub fn token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.token_file = Some(path.into());
        self
    }

    /// Set the default team
    pub fn default_team_id(mut self, team_id: impl Into<String>) -> Self {
        self.config.default_team_id = Some(team_id.into());
        self
    }

    /// Set the default channel
    pub fn default_channel_id(mut self, channel_id: impl Into<String>) -> Self {
        self.config.default_channel_id = Some(channel_id.into());
        self
    }

    /// Set the Incoming Webhook URL
    pub fn webhook_url(mut self, url: impl Into<String>) -> Result<Self, ConfigurationError> {
        let url = url.into();
        if Url::parse(&url).is_err() {
            return Err(ConfigurationError::InvalidUrl {
                field: "webhook_url".to_string(),
                url: "[REDACTED]".to_string(),
            });
        }
        self.config.webhook_url = Some(SecretString::new(url));
        Ok(self)
    }

    /// Build the configuration
    pub fn build(self) -> TeamsResult<TeamsConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Build the configuration without validation (for testing)
    pub fn build_unchecked(self) -> TeamsConfig {
        self.config
    }
}
