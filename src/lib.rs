//! Microsoft Teams Integration
//!
//! Teams client for the Microsoft Graph API with:
//! - Interactive login via the OAuth2 Device Authorization Grant (RFC 8628)
//! - Transparent, single-flight token refresh with one retry on 401
//! - Typed errors for auth, rate-limit, not-found and permission failures
//! - Users, teams/channels and chat operations
//! - Channel and Incoming Webhook notifiers
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use msteams_integration::{TeamsConfig, TeamsSession};
//! use msteams_integration::services::TeamsServiceTrait;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = TeamsSession::from_config(TeamsConfig::from_env()?)?;
//!
//!     session
//!         .login(
//!             |code, uri| println!("Open {} and enter {}", uri, code),
//!             &CancellationToken::new(),
//!         )
//!         .await?;
//!
//!     let client = session.teams_client().await?;
//!     for team in client.teams().list_joined_teams().await? {
//!         println!("{} ({})", team.display_name, team.id);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod core;
pub mod error;
pub mod flows;
pub mod notify;
pub mod services;
pub mod session;
pub mod token;
pub mod types;

// Re-exports for convenience
pub use client::{ApiRequester, GraphClient, StaticTokenClient, TeamsClient};
pub use config::{TeamsConfig, TeamsConfigBuilder};
pub use error::{TeamsError, TeamsResult};
pub use flows::{DeviceCodeAuthenticator, TokenRefresher};
pub use notify::{GraphChannelNotifier, Notification, NotificationLevel, Notifier, WebhookNotifier};
pub use session::{AuthStatus, TeamsSession};
pub use token::{FileTokenStore, InMemoryTokenStore, TokenStore};
pub use types::{AuthorizationState, DeviceCodeSession, MessageContent, TokenInfo};

/// Microsoft identity platform authority
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Graph API base URL
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Delegated permissions requested at login
pub const DEFAULT_SCOPES: &[&str] = &[
    "User.Read.All",
    "Team.ReadBasic.All",
    "Channel.ReadBasic.All",
    "ChannelMessage.Send",
    "ChatMessage.Send",
    "Chat.Create",
    "offline_access",
];

/// Default timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Refresh this many seconds before expiry
pub const DEFAULT_SKEW_BUFFER_SECS: u64 = 300;
