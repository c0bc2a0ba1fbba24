//! Error Types
//!
//! Closed error taxonomy for the Teams integration. The Graph client recovers
//! locally from a single expired-token 401; every other failure is surfaced
//! to the caller as one of these variants.

use std::time::Duration;
use thiserror::Error;

/// Result type for Teams operations.
pub type TeamsResult<T> = Result<T, TeamsError>;

/// Root error type for the Teams integration.
#[derive(Error, Debug)]
pub enum TeamsError {
    /// Interactive login never completed, or the session was rejected after a refresh.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The refresh exchange itself failed; a full login is required.
    #[error("Token refresh failed: {message}")]
    TokenRefresh { message: String },

    /// HTTP 429. `retry_after` is the literal `Retry-After` header value.
    #[error("Rate limited (Retry-After: {})", .retry_after.as_deref().unwrap_or("not provided"))]
    RateLimit { retry_after: Option<String> },

    /// HTTP 404.
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    /// HTTP 403.
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    /// Any other HTTP failure.
    #[error("Graph API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Response error: {0}")]
    Response(#[from] ResponseError),

    /// The caller's cancellation signal fired.
    #[error("Operation cancelled")]
    Cancelled,
}

impl TeamsError {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Authentication { .. } => "MSTEAMS_AUTH",
            Self::TokenRefresh { .. } => "MSTEAMS_TOKEN_REFRESH",
            Self::RateLimit { .. } => "MSTEAMS_RATE_LIMIT",
            Self::NotFound { .. } => "MSTEAMS_NOT_FOUND",
            Self::PermissionDenied { .. } => "MSTEAMS_PERMISSION",
            Self::Api { .. } => "MSTEAMS_API",
            Self::Configuration(_) => "MSTEAMS_CONFIG",
            Self::Network(_) => "MSTEAMS_NETWORK",
            Self::Storage(_) => "MSTEAMS_STORAGE",
            Self::Response(_) => "MSTEAMS_RESPONSE",
            Self::Cancelled => "MSTEAMS_CANCELLED",
        }
    }

    /// Check if the user has to run the interactive login again.
    pub fn needs_reauth(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::TokenRefresh { .. })
    }

    /// Get retry-after duration if the server sent one in delta-seconds form.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit {
                retry_after: Some(value),
            } => value.trim().parse::<u64>().ok().map(Duration::from_secs),
            _ => None,
        }
    }

    /// Get HTTP status code if applicable.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::RateLimit { .. } => Some(429),
            Self::NotFound { .. } => Some(404),
            Self::PermissionDenied { .. } => Some(403),
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        get_user_message(self)
    }

    /// Classify a non-success HTTP response from the resource API.
    ///
    /// `resource` is the request path, reported back in `NotFound`.
    pub fn from_response(
        status: u16,
        retry_after: Option<&str>,
        body: &str,
        resource: &str,
    ) -> Self {
        match status {
            401 => Self::Authentication {
                message: "Session expired, re-authenticate with 'msteams login'".to_string(),
            },
            429 => Self::RateLimit {
                retry_after: retry_after.map(String::from),
            },
            404 => Self::NotFound {
                resource: resource.to_string(),
            },
            403 => Self::PermissionDenied {
                message: parse_graph_error_message(body)
                    .unwrap_or_else(|| "Check the app's granted permissions".to_string()),
            },
            _ => Self::Api {
                status,
                message: parse_graph_error_message(body).unwrap_or_else(|| raw_body(body)),
            },
        }
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid URL for {field}: {url}")]
    InvalidUrl { field: String, url: String },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Network/transport error.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NetworkError::Timeout
        } else if err.is_connect() {
            NetworkError::ConnectionFailed {
                message: err.to_string(),
            }
        } else {
            NetworkError::Http(err.to_string())
        }
    }
}

/// Token storage error.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Read failed: {message}")]
    ReadFailed { message: String },

    #[error("Write failed: {message}")]
    WriteFailed { message: String },

    #[error("Delete failed: {message}")]
    DeleteFailed { message: String },

    #[error("Corrupted data: {message}")]
    CorruptedData { message: String },
}

/// Response parsing error.
#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },
}

/// Graph error body: `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, Clone, serde::Deserialize)]
struct GraphErrorResponse {
    error: GraphErrorBody,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct GraphErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Extract `error.message` from a Graph error body.
pub fn parse_graph_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<GraphErrorResponse>(body)
        .ok()
        .and_then(|response| response.error.message)
        .filter(|message| !message.is_empty())
}

fn raw_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no error details returned".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Get user-facing message for an error.
pub fn get_user_message(error: &TeamsError) -> String {
    match error {
        TeamsError::Authentication { message } => {
            format!("{}. Run 'msteams login' to sign in again.", message.trim_end_matches('.'))
        }
        TeamsError::TokenRefresh { .. } => {
            "Your session could not be renewed. Run 'msteams login' to sign in again.".to_string()
        }
        TeamsError::RateLimit { retry_after } => match retry_after {
            Some(value) => format!("Too many requests. Wait {} seconds and try again.", value),
            None => "Too many requests. Wait a moment and try again.".to_string(),
        },
        TeamsError::NotFound { resource } => format!("Not found: {}", resource),
        TeamsError::PermissionDenied { message } => format!("Permission denied: {}", message),
        TeamsError::Api { message, .. } => message.clone(),
        TeamsError::Cancelled => "Cancelled.".to_string(),
        other => other.to_string(),
    }
}
