//! Graph Records
//!
//! Directory and messaging records returned by the Graph API.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Azure AD user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_principal_name: Option<String>,
}

impl User {
    /// Mail address, falling back to the principal name.
    pub fn address(&self) -> Option<&str> {
        self.mail
            .as_deref()
            .or(self.user_principal_name.as_deref())
    }
}

/// Team the user has joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Channel within a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_membership_type")]
    pub membership_type: String,
}

fn default_membership_type() -> String {
    "standard".to_string()
}

/// One-on-one or group chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    #[serde(default)]
    pub chat_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

/// Message body as returned by Graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBody {
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub content: String,
}

/// Posted channel or chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ItemBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
}

/// Collection envelope: `{"value": [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

const ADAPTIVE_CARD_CONTENT_TYPE: &str = "application/vnd.microsoft.card.adaptive";
const CARD_ATTACHMENT_ID: &str = "adaptive-card";

/// Content of an outgoing message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Html(String),
    Text(String),
    AdaptiveCard(Value),
}

impl MessageContent {
    pub fn html(content: impl Into<String>) -> Self {
        Self::Html(content.into())
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// Build the `chatMessage` request body.
    ///
    /// Cards travel as an attachment referenced from an HTML body.
    pub fn to_request_body(&self) -> Value {
        match self {
            Self::Html(content) => json!({
                "body": { "contentType": "html", "content": content }
            }),
            Self::Text(content) => json!({
                "body": { "contentType": "text", "content": content }
            }),
            Self::AdaptiveCard(card) => json!({
                "body": {
                    "contentType": "html",
                    "content": format!("<attachment id=\"{}\"></attachment>", CARD_ATTACHMENT_ID)
                },
                "attachments": [{
                    "id": CARD_ATTACHMENT_ID,
                    "contentType": ADAPTIVE_CARD_CONTENT_TYPE,
                    "content": card.to_string()
                }]
            }),
        }
    }
}

impl From<&str> for MessageContent {
    fn from(content: &str) -> Self {
        Self::Html(content.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(content: String) -> Self {
        Self::Html(content)
    }
}
