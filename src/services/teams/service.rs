//! Teams service implementation.

use crate::client::{decode_body, ApiRequester};
use crate::core::HttpMethod;
use crate::error::TeamsResult;
use crate::types::{Channel, ChatMessage, ListResponse, MessageContent, Team};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

/// Trait for teams service operations
#[async_trait]
pub trait TeamsServiceTrait: Send + Sync {
    /// Teams the signed-in user has joined
    async fn list_joined_teams(&self) -> TeamsResult<Vec<Team>>;

    /// Get a team by id
    async fn get_team(&self, team_id: &str) -> TeamsResult<Team>;

    /// Channels of a team
    async fn list_channels(&self, team_id: &str) -> TeamsResult<Vec<Channel>>;

    /// Get a channel by id
    async fn get_channel(&self, team_id: &str, channel_id: &str) -> TeamsResult<Channel>;

    /// Post a new message to a channel
    async fn send_channel_message(
        &self,
        team_id: &str,
        channel_id: &str,
        content: MessageContent,
    ) -> TeamsResult<ChatMessage>;

    /// Reply in the thread of an existing channel message
    async fn reply_to_message(
        &self,
        team_id: &str,
        channel_id: &str,
        message_id: &str,
        content: MessageContent,
    ) -> TeamsResult<ChatMessage>;
}

/// Teams service implementation
#[derive(Clone)]
pub struct TeamsService {
    api: Arc<dyn ApiRequester>,
}

impl TeamsService {
    /// Create a new teams service
    pub fn new(api: Arc<dyn ApiRequester>) -> Self {
        Self { api }
    }
}

fn segment(id: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(id)
}

fn channel_path(team_id: &str, channel_id: &str) -> String {
    format!(
        "/teams/{}/channels/{}",
        segment(team_id),
        segment(channel_id)
    )
}

#[async_trait]
impl TeamsServiceTrait for TeamsService {
    #[instrument(skip(self))]
    async fn list_joined_teams(&self) -> TeamsResult<Vec<Team>> {
        let value = self
            .api
            .request(HttpMethod::Get, "/me/joinedTeams", None)
            .await?;
        let list: ListResponse<Team> = decode_body(value)?;
        Ok(list.value)
    }

    #[instrument(skip(self))]
    async fn get_team(&self, team_id: &str) -> TeamsResult<Team> {
        let path = format!("/teams/{}", segment(team_id));
        decode_body(self.api.request(HttpMethod::Get, &path, None).await?)
    }

    #[instrument(skip(self))]
    async fn list_channels(&self, team_id: &str) -> TeamsResult<Vec<Channel>> {
        let path = format!("/teams/{}/channels", segment(team_id));
        let value = self.api.request(HttpMethod::Get, &path, None).await?;
        let list: ListResponse<Channel> = decode_body(value)?;
        Ok(list.value)
    }

    #[instrument(skip(self))]
    async fn get_channel(&self, team_id: &str, channel_id: &str) -> TeamsResult<Channel> {
        let path = channel_path(team_id, channel_id);
        decode_body(self.api.request(HttpMethod::Get, &path, None).await?)
    }

    #[instrument(skip(self, content))]
    async fn send_channel_message(
        &self,
        team_id: &str,
        channel_id: &str,
        content: MessageContent,
    ) -> TeamsResult<ChatMessage> {
        let path = format!("{}/messages", channel_path(team_id, channel_id));
        let body = content.to_request_body();
        decode_body(self.api.request(HttpMethod::Post, &path, Some(&body)).await?)
    }

    #[instrument(skip(self, content))]
    async fn reply_to_message(
        &self,
        team_id: &str,
        channel_id: &str,
        message_id: &str,
        content: MessageContent,
    ) -> TeamsResult<ChatMessage> {
        let path = format!(
            "{}/messages/{}/replies",
            channel_path(team_id, channel_id),
            segment(message_id)
        );
        let body = content.to_request_body();
        decode_body(self.api.request(HttpMethod::Post, &path, Some(&body)).await?)
    }
}
