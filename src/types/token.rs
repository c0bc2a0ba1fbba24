//! Token Types
//!
//! Token endpoint response and the immutable credential derived from it.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Successful response from the token endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Token type (usually "Bearer").
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds.
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    /// Refresh token. Absent on some refresh responses.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Granted scopes, space separated.
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

fn default_expires_in() -> u64 {
    3600
}

/// Credential in use by the Graph client.
///
/// A value is never mutated after construction; a refresh produces a new one.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    scope: String,
}

impl TokenInfo {
    /// Create a bearer token with no recorded scope.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
            token_type: default_token_type(),
            scope: String::new(),
        }
    }

    /// Build from a token endpoint response received at `issued_at`.
    ///
    /// When the response carries no refresh token, `previous_refresh` is kept.
    pub fn from_response(
        response: TokenResponse,
        issued_at: DateTime<Utc>,
        previous_refresh: Option<&str>,
    ) -> Self {
        let refresh_token = response
            .refresh_token
            .filter(|token| !token.is_empty())
            .or_else(|| previous_refresh.map(String::from))
            .unwrap_or_default();

        Self {
            access_token: response.access_token,
            refresh_token,
            expires_at: expiry_after(issued_at, response.expires_in),
            token_type: response.token_type,
            scope: response.scope.unwrap_or_default(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Check if a refresh token is available.
    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// Check whether the token must be renewed before use.
    pub fn needs_refresh(&self, skew: Duration) -> bool {
        self.needs_refresh_at(Utc::now(), skew)
    }

    /// Renewal is due once `now` is past `expires_at - skew`.
    pub fn needs_refresh_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        let renew_at = i64::try_from(skew.as_secs())
            .ok()
            .and_then(ChronoDuration::try_seconds)
            .and_then(|skew| self.expires_at.checked_sub_signed(skew));
        match renew_at {
            Some(renew_at) => now > renew_at,
            None => true,
        }
    }

    /// Check if the token is past its expiry.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Remaining lifetime, zero once expired.
    pub fn remaining_lifetime(&self) -> Duration {
        (self.expires_at - Utc::now()).to_std().unwrap_or_default()
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

/// `issued_at + lifetime_secs`, saturating at the latest representable instant.
fn expiry_after(issued_at: DateTime<Utc>, lifetime_secs: u64) -> DateTime<Utc> {
    i64::try_from(lifetime_secs)
        .ok()
        .and_then(ChronoDuration::try_seconds)
        .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl std::fmt::Debug for TokenInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenInfo")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .finish()
    }
}
