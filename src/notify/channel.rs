//! Channel notifier backed by the Graph API.

use async_trait::async_trait;
use std::fmt::Write as _;
use tracing::instrument;

use super::{Notification, Notifier};
use crate::config::TeamsConfig;
use crate::error::{ConfigurationError, TeamsError, TeamsResult};
use crate::services::{TeamsService, TeamsServiceTrait};
use crate::types::MessageContent;

/// Posts HTML messages to one team channel.
#[derive(Clone)]
pub struct GraphChannelNotifier {
    teams: TeamsService,
    team_id: String,
    channel_id: String,
}

impl GraphChannelNotifier {
    pub fn new(
        teams: TeamsService,
        team_id: impl Into<String>,
        channel_id: impl Into<String>,
    ) -> Self {
        Self {
            teams,
            team_id: team_id.into(),
            channel_id: channel_id.into(),
        }
    }

    /// Target the configured default team and channel.
    pub fn from_config(config: &TeamsConfig, teams: TeamsService) -> TeamsResult<Self> {
        let team_id = config.default_team_id.clone().ok_or_else(|| missing("default_team_id"))?;
        let channel_id = config
            .default_channel_id
            .clone()
            .ok_or_else(|| missing("default_channel_id"))?;
        Ok(Self::new(teams, team_id, channel_id))
    }
}

fn missing(field: &str) -> TeamsError {
    TeamsError::Configuration(ConfigurationError::MissingRequired {
        field: field.to_string(),
    })
}

/// Escape text for inclusion in an HTML message body.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a notification as a compact HTML block.
fn render_html(notification: &Notification) -> String {
    let mut html = format!("<h3>{}</h3>", escape_html(&notification.headline()));

    if let Some(message) = notification.message.as_deref().filter(|m| !m.is_empty()) {
        let _ = write!(html, "<p>{}</p>", escape_html(message));
    }

    if !notification.fields.is_empty() {
        html.push_str("<ul>");
        for (name, value) in &notification.fields {
            let _ = write!(
                html,
                "<li><b>{}:</b> {}</li>",
                escape_html(name),
                escape_html(value)
            );
        }
        html.push_str("</ul>");
    }

    if let Some(url) = &notification.url {
        let _ = write!(
            html,
            "<p><a href=\"{}\">View Details</a></p>",
            escape_html(url)
        );
    }

    html
}

#[async_trait]
impl Notifier for GraphChannelNotifier {
    #[instrument(skip(self, text), fields(team = %self.team_id, channel = %self.channel_id))]
    async fn send_message(&self, text: &str) -> TeamsResult<()> {
        self.teams
            .send_channel_message(
                &self.team_id,
                &self.channel_id,
                MessageContent::html(escape_html(text)),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, notification), fields(team = %self.team_id, channel = %self.channel_id))]
    async fn notify(&self, notification: &Notification) -> TeamsResult<()> {
        self.teams
            .send_channel_message(
                &self.team_id,
                &self.channel_id,
                MessageContent::html(render_html(notification)),
            )
            .await?;
        Ok(())
    }
}
