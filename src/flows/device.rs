//! Device Authorization Flow
//!
//! RFC 8628 - OAuth 2.0 Device Authorization Grant against the Microsoft
//! identity platform, plus the refresh-token exchange used by the Graph client.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::TeamsConfig;
use crate::core::{HttpRequest, HttpTransport};
use crate::error::{ResponseError, TeamsError, TeamsResult};
use crate::types::{
    AuthorizationState, DeviceCodeSession, DevicePollOutcome, TokenInfo, TokenResponse,
};

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
const SLOW_DOWN_INCREMENT: Duration = Duration::from_secs(5);
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Exchanges a refresh token for a new credential.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Perform one refresh exchange. Never retries.
    async fn refresh(&self, refresh_token: &str) -> TeamsResult<TokenInfo>;
}

/// OAuth error body returned by the token endpoint.
#[derive(serde::Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Interactive device-code login.
pub struct DeviceCodeAuthenticator {
    config: Arc<TeamsConfig>,
    transport: Arc<dyn HttpTransport>,
    state: Mutex<AuthorizationState>,
}

impl DeviceCodeAuthenticator {
    /// Create a new authenticator.
    pub fn new(config: Arc<TeamsConfig>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            config,
            transport,
            state: Mutex::new(AuthorizationState::NotStarted),
        }
    }

    /// Current state of the login.
    pub fn state(&self) -> AuthorizationState {
        *self.state.lock()
    }

    fn set_state(&self, state: AuthorizationState) {
        let mut current = self.state.lock();
        if *current != state {
            debug!(from = ?*current, to = ?state, "Device flow state change");
            *current = state;
        }
    }

    /// Request a device code. Restarts the flow from any state.
    #[instrument(skip(self))]
    pub async fn initiate(&self) -> TeamsResult<DeviceCodeSession> {
        self.set_state(AuthorizationState::NotStarted);

        let scope = self.config.scope_string();
        let request = HttpRequest::form(
            self.config.device_code_endpoint(),
            &[
                ("client_id", self.config.client_id.as_str()),
                ("scope", scope.as_str()),
            ],
        )
        .timeout(self.config.timeout);

        let response = self.transport.send(request).await?;

        if response.status != 200 {
            return Err(TeamsError::Authentication {
                message: format!("Failed to get device code: {}", response.body.trim()),
            });
        }

        let session: DeviceCodeSession = serde_json::from_str(&response.body).map_err(|e| {
            TeamsError::Response(ResponseError::InvalidJson {
                message: e.to_string(),
            })
        })?;

        self.set_state(AuthorizationState::CodeIssued);
        info!(
            expires_in = session.expires_in,
            interval = session.interval,
            "Device code issued"
        );

        Ok(session)
    }

    /// Poll until the user completes, declines or the code expires.
    ///
    /// `on_user_code(user_code, verification_uri)` is invoked once before the
    /// first wait.
    #[instrument(skip_all, fields(interval = session.interval, expires_in = session.expires_in))]
    pub async fn await_authorization<F>(
        &self,
        session: &DeviceCodeSession,
        on_user_code: F,
        cancel: &CancellationToken,
    ) -> TeamsResult<TokenInfo>
    where
        F: FnOnce(&str, &str) + Send,
    {
        on_user_code(&session.user_code, &session.verification_uri);
        self.set_state(AuthorizationState::Polling);

        let started = Instant::now();
        let lifetime = session.lifetime();
        let mut interval = session.polling_interval().max(MIN_POLL_INTERVAL);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.set_state(AuthorizationState::Cancelled);
                    info!("Device authorization cancelled");
                    return Err(TeamsError::Cancelled);
                }
                _ = tokio::time::sleep(interval) => {}
            }

            if started.elapsed() >= lifetime {
                self.set_state(AuthorizationState::Expired);
                return Err(TeamsError::Authentication {
                    message: "Device code expired before authorization completed".to_string(),
                });
            }

            let outcome = match self.poll_once(&session.device_code).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.set_state(AuthorizationState::NotStarted);
                    warn!(error = %e, "Device authorization poll failed");
                    return Err(e);
                }
            };

            match outcome {
                DevicePollOutcome::Success(response) => {
                    self.set_state(AuthorizationState::Authorized);
                    info!("Device authorization completed");
                    return Ok(TokenInfo::from_response(response, Utc::now(), None));
                }
                DevicePollOutcome::Pending => continue,
                DevicePollOutcome::SlowDown => {
                    interval += SLOW_DOWN_INCREMENT;
                    debug!(interval_secs = interval.as_secs(), "Server requested slow_down");
                }
                DevicePollOutcome::Expired => {
                    self.set_state(AuthorizationState::Expired);
                    return Err(TeamsError::Authentication {
                        message: "Device code expired".to_string(),
                    });
                }
                DevicePollOutcome::Declined => {
                    self.set_state(AuthorizationState::Declined);
                    return Err(TeamsError::Authentication {
                        message: "User declined authorization".to_string(),
                    });
                }
                DevicePollOutcome::Failed { error, description } => {
                    self.set_state(AuthorizationState::NotStarted);
                    warn!(error = %error, "Device authorization failed");
                    return Err(TeamsError::Authentication {
                        message: description.unwrap_or(error),
                    });
                }
            }
        }
    }

    /// Run the full flow: `initiate` then `await_authorization`.
    pub async fn authenticate<F>(
        &self,
        on_user_code: F,
        cancel: &CancellationToken,
    ) -> TeamsResult<TokenInfo>
    where
        F: FnOnce(&str, &str) + Send,
    {
        let session = self.initiate().await?;
        self.await_authorization(&session, on_user_code, cancel).await
    }

    async fn poll_once(&self, device_code: &str) -> TeamsResult<DevicePollOutcome> {
        let request = HttpRequest::form(
            self.config.token_endpoint(),
            &[
                ("grant_type", DEVICE_CODE_GRANT),
                ("client_id", self.config.client_id.as_str()),
                ("device_code", device_code),
            ],
        )
        .timeout(self.config.timeout);

        let response = self.transport.send(request).await?;

        if response.status == 200 {
            let token: TokenResponse = serde_json::from_str(&response.body).map_err(|e| {
                TeamsError::Response(ResponseError::InvalidJson {
                    message: e.to_string(),
                })
            })?;
            return Ok(DevicePollOutcome::Success(token));
        }

        match serde_json::from_str::<OAuthErrorResponse>(&response.body) {
            Ok(error) => Ok(DevicePollOutcome::from_error_code(
                &error.error,
                error.error_description,
            )),
            Err(_) => Ok(DevicePollOutcome::Failed {
                error: format!("http_{}", response.status),
                description: Some(format!(
                    "Token endpoint returned {}: {}",
                    response.status,
                    response.body.trim()
                )),
            }),
        }
    }
}

#[async_trait]
impl TokenRefresher for DeviceCodeAuthenticator {
    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> TeamsResult<TokenInfo> {
        if refresh_token.is_empty() {
            return Err(TeamsError::TokenRefresh {
                message: "No refresh token available".to_string(),
            });
        }

        let scope = self.config.scope_string();
        let request = HttpRequest::form(
            self.config.token_endpoint(),
            &[
                ("grant_type", "refresh_token"),
                ("client_id", self.config.client_id.as_str()),
                ("refresh_token", refresh_token),
                ("scope", scope.as_str()),
            ],
        )
        .timeout(self.config.timeout);

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| TeamsError::TokenRefresh {
                message: e.to_string(),
            })?;

        if response.status != 200 {
            let message = match serde_json::from_str::<OAuthErrorResponse>(&response.body) {
                Ok(error) => error.error_description.unwrap_or(error.error),
                Err(_) => format!("HTTP {}: {}", response.status, response.body.trim()),
            };
            warn!(status = response.status, "Token refresh rejected");
            return Err(TeamsError::TokenRefresh { message });
        }

        let token: TokenResponse =
            serde_json::from_str(&response.body).map_err(|e| TeamsError::TokenRefresh {
                message: format!("Invalid token response: {}", e),
            })?;

        debug!("Access token refreshed");
        Ok(TokenInfo::from_response(token, Utc::now(), Some(refresh_token)))
    }
}

impl std::fmt::Debug for DeviceCodeAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceCodeAuthenticator")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}
