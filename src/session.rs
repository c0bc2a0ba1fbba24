//! Session
//!
//! Ties configuration, the device-code login and token persistence together
//! for callers that just want "log in once, then call Graph".

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::client::{GraphClient, TeamsClient};
use crate::config::TeamsConfig;
use crate::core::{HttpTransport, ReqwestHttpTransport};
use crate::error::{TeamsError, TeamsResult};
use crate::flows::DeviceCodeAuthenticator;
use crate::services::UsersServiceTrait;
use crate::token::{FileTokenStore, InMemoryTokenStore, TokenStore};
use crate::types::{TokenInfo, User};

/// Result of `TeamsSession::status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    /// No stored token.
    NotAuthenticated,
    /// The stored token works for this user.
    Authenticated(User),
    /// A token is stored but Graph rejected the session.
    Invalid(String),
}

/// Login, logout and client construction over one token store.
pub struct TeamsSession {
    config: Arc<TeamsConfig>,
    transport: Arc<dyn HttpTransport>,
    authenticator: Arc<DeviceCodeAuthenticator>,
    store: Arc<dyn TokenStore>,
}

impl TeamsSession {
    pub fn new(
        config: Arc<TeamsConfig>,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        let authenticator = Arc::new(DeviceCodeAuthenticator::new(
            config.clone(),
            transport.clone(),
        ));
        Self {
            config,
            transport,
            authenticator,
            store,
        }
    }

    /// Build a session with the reqwest transport and the configured token file.
    ///
    /// Without a token file, tokens live only in memory.
    pub fn from_config(config: TeamsConfig) -> TeamsResult<Self> {
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestHttpTransport::new(config.timeout)?);
        let store: Arc<dyn TokenStore> = match &config.token_file {
            Some(path) => Arc::new(FileTokenStore::new(path.clone())),
            None => Arc::new(InMemoryTokenStore::new()),
        };
        Ok(Self::new(Arc::new(config), transport, store))
    }

    pub fn config(&self) -> &TeamsConfig {
        &self.config
    }

    pub fn authenticator(&self) -> &DeviceCodeAuthenticator {
        &self.authenticator
    }

    /// Run the device-code flow and persist the resulting token.
    pub async fn login<F>(&self, on_user_code: F, cancel: &CancellationToken) -> TeamsResult<TokenInfo>
    where
        F: FnOnce(&str, &str) + Send,
    {
        let token = self.authenticator.authenticate(on_user_code, cancel).await?;
        self.store.save(&token).await?;
        info!("Login complete, token stored");
        Ok(token)
    }

    /// Forget the stored token. Returns whether one existed.
    pub async fn logout(&self) -> TeamsResult<bool> {
        let cleared = self.store.clear().await?;
        info!(cleared, "Logged out");
        Ok(cleared)
    }

    /// Graph client over the stored token.
    pub async fn client(&self) -> TeamsResult<Arc<GraphClient>> {
        let token = self.store.load().await?.ok_or_else(|| TeamsError::Authentication {
            message: "Not authenticated, run 'msteams login' first".to_string(),
        })?;

        Ok(Arc::new(GraphClient::new(
            self.config.clone(),
            self.transport.clone(),
            self.authenticator.clone(),
            self.store.clone(),
            token,
        )))
    }

    /// Service facade over the stored token.
    pub async fn teams_client(&self) -> TeamsResult<TeamsClient> {
        Ok(TeamsClient::new(self.client().await?))
    }

    /// Check whether the stored token still works.
    pub async fn status(&self) -> TeamsResult<AuthStatus> {
        if self.store.load().await?.is_none() {
            return Ok(AuthStatus::NotAuthenticated);
        }

        let client = self.teams_client().await?;
        match client.users().me().await {
            Ok(user) => Ok(AuthStatus::Authenticated(user)),
            Err(e) => Ok(AuthStatus::Invalid(e.to_string())),
        }
    }
}

impl std::fmt::Debug for TeamsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeamsSession")
            .field("config", &self.config)
            .field("state", &self.authenticator.state())
            .finish()
    }
}
