//! Chats service implementation.

use crate::client::{decode_body, ApiRequester};
use crate::core::HttpMethod;
use crate::error::{ResponseError, TeamsError, TeamsResult};
use crate::services::users::{UsersService, UsersServiceTrait};
use crate::types::{Chat, ChatMessage, ListResponse, MessageContent};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};

const MEMBER_ODATA_TYPE: &str = "#microsoft.graph.aadUserConversationMember";

/// Trait for chats service operations
#[async_trait]
pub trait ChatsServiceTrait: Send + Sync {
    /// Open (or reuse) the one-on-one chat with `address` and return its id
    async fn get_or_create_chat(&self, address: &str) -> TeamsResult<String>;

    /// Post a message to a chat
    async fn send_chat_message(
        &self,
        chat_id: &str,
        content: MessageContent,
    ) -> TeamsResult<ChatMessage>;

    /// Chats of the signed-in user
    async fn list_chats(&self) -> TeamsResult<Vec<Chat>>;
}

/// Chats service implementation
#[derive(Clone)]
pub struct ChatsService {
    api: Arc<dyn ApiRequester>,
    users: UsersService,
}

impl ChatsService {
    /// Create a new chats service
    pub fn new(api: Arc<dyn ApiRequester>, users: UsersService) -> Self {
        Self { api, users }
    }
}

fn owner_member(user_id: &str) -> Value {
    json!({
        "@odata.type": MEMBER_ODATA_TYPE,
        "roles": ["owner"],
        "user@odata.bind": format!("{}/users('{}')", crate::DEFAULT_GRAPH_BASE_URL, user_id),
    })
}

/// Body for creating a one-on-one chat between two principals.
fn one_on_one_body(my_id: &str, other_id: &str) -> Value {
    json!({
        "chatType": "oneOnOne",
        "members": [owner_member(my_id), owner_member(other_id)],
    })
}

#[async_trait]
impl ChatsServiceTrait for ChatsService {
    #[instrument(skip(self))]
    async fn get_or_create_chat(&self, address: &str) -> TeamsResult<String> {
        let other_id = self.users.resolve_user_id(address).await?;
        let me = self.users.me().await?;

        let body = one_on_one_body(&me.id, &other_id);
        let value = self.api.request(HttpMethod::Post, "/chats", Some(&body)).await?;

        let chat_id = value
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                TeamsError::Response(ResponseError::MissingField {
                    field: "id".to_string(),
                })
            })?;

        info!(chat_id = %chat_id, "One-on-one chat ready");
        Ok(chat_id.to_string())
    }

    #[instrument(skip(self, content))]
    async fn send_chat_message(
        &self,
        chat_id: &str,
        content: MessageContent,
    ) -> TeamsResult<ChatMessage> {
        let path = format!("/chats/{}/messages", urlencoding::encode(chat_id));
        let body = content.to_request_body();
        decode_body(self.api.request(HttpMethod::Post, &path, Some(&body)).await?)
    }

    #[instrument(skip(self))]
    async fn list_chats(&self) -> TeamsResult<Vec<Chat>> {
        let value = self.api.request(HttpMethod::Get, "/me/chats", None).await?;
        let list: ListResponse<Chat> = decode_body(value)?;
        Ok(list.value)
    }
}
