//! Incoming Webhook notifier (legacy MessageCard format).

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{Notification, Notifier};
use crate::config::TeamsConfig;
use crate::core::{HttpMethod, HttpRequest, HttpTransport};
use crate::error::{ConfigurationError, ResponseError, TeamsError, TeamsResult};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);
const CARD_CONTEXT: &str = "http://schema.org/extensions";

/// Connector MessageCard payload.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MessageCard {
    #[serde(rename = "@type")]
    pub card_type: &'static str,
    #[serde(rename = "@context")]
    pub context: &'static str,
    #[serde(rename = "themeColor", skip_serializing_if = "Option::is_none")]
    pub theme_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<CardSection>,
    #[serde(rename = "potentialAction", skip_serializing_if = "Vec::is_empty")]
    pub potential_action: Vec<CardAction>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardSection {
    pub activity_title: String,
    pub activity_subtitle: String,
    pub facts: Vec<CardFact>,
    pub markdown: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CardFact {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CardAction {
    #[serde(rename = "@type")]
    pub action_type: &'static str,
    pub name: String,
    pub targets: Vec<CardTarget>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CardTarget {
    pub os: &'static str,
    pub uri: String,
}

impl MessageCard {
    /// Card carrying only text.
    pub fn simple(text: impl Into<String>) -> Self {
        Self {
            card_type: "MessageCard",
            context: CARD_CONTEXT,
            theme_color: None,
            summary: None,
            text: Some(text.into()),
            sections: Vec::new(),
            potential_action: Vec::new(),
        }
    }

    /// Card for a rich notification.
    pub fn from_notification(notification: &Notification) -> Self {
        let section = CardSection {
            activity_title: notification.headline(),
            activity_subtitle: format!("via msteams | {}", notification.event_type),
            facts: notification
                .fields
                .iter()
                .map(|(name, value)| CardFact {
                    name: name.clone(),
                    value: value.clone(),
                })
                .collect(),
            markdown: true,
            text: notification.message.clone().filter(|m| !m.is_empty()),
        };

        let potential_action = notification
            .url
            .iter()
            .map(|uri| CardAction {
                action_type: "OpenUri",
                name: "View Details".to_string(),
                targets: vec![CardTarget {
                    os: "default",
                    uri: uri.clone(),
                }],
            })
            .collect();

        Self {
            card_type: "MessageCard",
            context: CARD_CONTEXT,
            theme_color: Some(notification.level.theme_color().to_string()),
            summary: Some(notification.title.clone()),
            text: None,
            sections: vec![section],
            potential_action,
        }
    }
}

/// Posts MessageCards to an Incoming Webhook URL.
pub struct WebhookNotifier {
    url: SecretString,
    transport: Arc<dyn HttpTransport>,
}

impl WebhookNotifier {
    pub fn new(url: SecretString, transport: Arc<dyn HttpTransport>) -> Self {
        Self { url, transport }
    }

    /// Build from the configured `webhook_url`.
    pub fn from_config(
        config: &TeamsConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> TeamsResult<Self> {
        let url = config.webhook_url.clone().ok_or_else(|| {
            TeamsError::Configuration(ConfigurationError::MissingRequired {
                field: "webhook_url".to_string(),
            })
        })?;
        Ok(Self::new(url, transport))
    }

    #[instrument(skip_all)]
    async fn post(&self, card: &MessageCard) -> TeamsResult<()> {
        let body = serde_json::to_string(card).map_err(|e| {
            TeamsError::Response(ResponseError::InvalidJson {
                message: e.to_string(),
            })
        })?;

        let request = HttpRequest::new(HttpMethod::Post, self.url.expose_secret().as_str())
            .header("content-type", "application/json")
            .body(body)
            .timeout(WEBHOOK_TIMEOUT);

        let response = self.transport.send(request).await?;

        if response.status != 200 {
            warn!(status = response.status, "Webhook rejected the card");
            return Err(TeamsError::Api {
                status: response.status,
                message: if response.body.trim().is_empty() {
                    "Webhook rejected the message".to_string()
                } else {
                    response.body.trim().to_string()
                },
            });
        }

        debug!("Webhook card delivered");
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_message(&self, text: &str) -> TeamsResult<()> {
        self.post(&MessageCard::simple(text)).await
    }

    async fn notify(&self, notification: &Notification) -> TeamsResult<()> {
        self.post(&MessageCard::from_notification(notification)).await
    }
}

impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookNotifier")
            .field("url", &"[REDACTED]")
            .finish()
    }
}
