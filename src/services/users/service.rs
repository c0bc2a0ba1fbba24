//! Users service implementation.

use super::PrincipalCache;
use crate::client::{decode_body, ApiRequester};
use crate::core::HttpMethod;
use crate::error::{ResponseError, TeamsError, TeamsResult};
use crate::types::{ListResponse, User};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

const USER_SELECT: &str = "id,displayName,mail,userPrincipalName";

/// Trait for users service operations
#[async_trait]
pub trait UsersServiceTrait: Send + Sync {
    /// Profile of the signed-in user
    async fn me(&self) -> TeamsResult<User>;

    /// List directory users, optionally filtered by name or mail prefix
    async fn list_users(&self, search: Option<&str>, limit: u32) -> TeamsResult<Vec<User>>;

    /// Look up a user by mail address or principal name
    async fn get_user(&self, address: &str) -> TeamsResult<User>;

    /// Resolve an address to a directory id, using the cache first
    async fn resolve_user_id(&self, address: &str) -> TeamsResult<String>;
}

/// Users service implementation
#[derive(Clone)]
pub struct UsersService {
    api: Arc<dyn ApiRequester>,
    cache: Arc<PrincipalCache>,
}

impl UsersService {
    /// Create a new users service
    pub fn new(api: Arc<dyn ApiRequester>) -> Self {
        Self::with_cache(api, Arc::new(PrincipalCache::new()))
    }

    /// Create a users service sharing an existing cache
    pub fn with_cache(api: Arc<dyn ApiRequester>, cache: Arc<PrincipalCache>) -> Self {
        Self { api, cache }
    }

    pub fn cache(&self) -> &PrincipalCache {
        &self.cache
    }
}

/// Build the `/users` query for a listing.
fn list_users_path(search: Option<&str>, limit: u32) -> String {
    let mut path = format!("/users?$top={}&$select={}", limit, USER_SELECT);

    if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
        let quoted = term.replace('\'', "''");
        let filter = format!(
            "startswith(displayName,'{q}') or startswith(mail,'{q}')",
            q = quoted
        );
        path.push_str("&$filter=");
        path.push_str(&urlencoding::encode(&filter));
    }

    path
}

#[async_trait]
impl UsersServiceTrait for UsersService {
    #[instrument(skip(self))]
    async fn me(&self) -> TeamsResult<User> {
        let value = self.api.request(HttpMethod::Get, "/me", None).await?;
        decode_body(value)
    }

    #[instrument(skip(self))]
    async fn list_users(&self, search: Option<&str>, limit: u32) -> TeamsResult<Vec<User>> {
        let path = list_users_path(search, limit);
        let value = self.api.request(HttpMethod::Get, &path, None).await?;
        let list: ListResponse<User> = decode_body(value)?;
        Ok(list.value)
    }

    #[instrument(skip(self))]
    async fn get_user(&self, address: &str) -> TeamsResult<User> {
        let path = format!("/users/{}", urlencoding::encode(address.trim()));
        let value = self.api.request(HttpMethod::Get, &path, None).await?;
        let user: User = decode_body(value)?;

        if user.id.is_empty() {
            return Err(TeamsError::Response(ResponseError::MissingField {
                field: "id".to_string(),
            }));
        }

        self.cache.insert(address, user.id.clone());
        Ok(user)
    }

    async fn resolve_user_id(&self, address: &str) -> TeamsResult<String> {
        if let Some(id) = self.cache.get(address) {
            debug!("Principal cache hit");
            return Ok(id);
        }

        Ok(self.get_user(address).await?.id)
    }
}
