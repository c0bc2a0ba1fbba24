//! Device Authorization Types
//!
//! Types for the OAuth2 Device Authorization Grant (RFC 8628).

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::TokenResponse;

/// Device authorization response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCodeSession {
    /// Device verification code (not shown to user).
    pub device_code: String,
    /// User code to display.
    pub user_code: String,
    /// URI for user to visit.
    pub verification_uri: String,
    /// Lifetime in seconds.
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    /// Minimum polling interval in seconds.
    #[serde(default = "default_interval")]
    pub interval: u64,
    /// Human-readable instruction from the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn default_expires_in() -> u64 {
    900
}

fn default_interval() -> u64 {
    5
}

impl DeviceCodeSession {
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.expires_in)
    }
}

/// Outcome of a single token poll.
#[derive(Clone, Debug)]
pub enum DevicePollOutcome {
    /// Token received.
    Success(TokenResponse),
    /// User has not finished yet.
    Pending,
    /// Server asked for a longer interval.
    SlowDown,
    /// Device code expired.
    Expired,
    /// User declined the request.
    Declined,
    /// Any other OAuth error code.
    Failed {
        error: String,
        description: Option<String>,
    },
}

impl DevicePollOutcome {
    /// Classify an OAuth error code returned while polling.
    pub fn from_error_code(error: &str, description: Option<String>) -> Self {
        match error {
            "authorization_pending" => Self::Pending,
            "slow_down" => Self::SlowDown,
            "expired_token" => Self::Expired,
            "access_denied" | "authorization_declined" => Self::Declined,
            _ => Self::Failed {
                error: error.to_string(),
                description,
            },
        }
    }

    /// Check if polling should continue.
    pub fn should_continue_polling(&self) -> bool {
        matches!(self, Self::Pending | Self::SlowDown)
    }
}

/// Observable state of the interactive login.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthorizationState {
    #[default]
    NotStarted,
    CodeIssued,
    Polling,
    Authorized,
    Declined,
    Expired,
    Cancelled,
}

impl AuthorizationState {
    /// Check if the state ends the flow.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Authorized | Self::Declined | Self::Expired | Self::Cancelled
        )
    }
}
