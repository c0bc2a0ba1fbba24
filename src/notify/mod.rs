//! Notifications
//!
//! Short status messages posted either to a channel through the Graph API
//! or to an Incoming Webhook.

mod channel;
mod webhook;

pub use channel::GraphChannelNotifier;
pub use webhook::{MessageCard, WebhookNotifier};

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{ConfigurationError, TeamsResult};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NotificationLevel {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationLevel {
    /// Card theme colour as a hex string without `#`.
    pub fn theme_color(&self) -> &'static str {
        match self {
            Self::Info => "0078D7",
            Self::Success => "28A745",
            Self::Warning => "FFC107",
            Self::Error => "DC3545",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl FromStr for NotificationLevel {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "success" => Ok(Self::Success),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(ConfigurationError::InvalidValue {
                field: "level".to_string(),
                message: format!("unknown notification level '{}'", other),
            }),
        }
    }
}

/// Emoji prefix for an event type. Unknown events get a bell.
pub fn event_emoji(event_type: &str) -> &'static str {
    match event_type {
        "commit" => "\u{1F528}",
        "branch" => "\u{1F331}",
        "pr" => "\u{1F500}",
        "task" => "\u{1F4CB}",
        "deploy" => "\u{1F680}",
        "alert" => "\u{26A0}",
        "message" => "\u{1F4AC}",
        _ => "\u{1F514}",
    }
}

/// Rich notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notification {
    pub event_type: String,
    pub title: String,
    pub message: Option<String>,
    pub url: Option<String>,
    /// Name/value facts, rendered in key order.
    pub fields: BTreeMap<String, String>,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn new(event_type: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn level(mut self, level: NotificationLevel) -> Self {
        self.level = level;
        self
    }

    /// Title prefixed with the event emoji.
    pub fn headline(&self) -> String {
        format!("{} {}", event_emoji(&self.event_type), self.title)
    }
}

/// Something that can deliver notifications to Teams.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post a plain message.
    async fn send_message(&self, text: &str) -> TeamsResult<()>;

    /// Post a rich notification.
    async fn notify(&self, notification: &Notification) -> TeamsResult<()>;
}
