//! Clients
//!
//! The request contract shared by the device-flow Graph client and the
//! static-token client, and the `TeamsClient` facade over the services.

mod graph;
mod static_token;

pub use graph::GraphClient;
pub use static_token::StaticTokenClient;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::core::HttpMethod;
use crate::error::{NetworkError, ResponseError, TeamsError, TeamsResult};
use crate::services::{ChatsService, TeamsService, UsersService};

/// Authenticated request contract.
#[async_trait]
pub trait ApiRequester: Send + Sync {
    /// Make sure the credential is usable for the next request.
    async fn ensure_fresh(&self) -> TeamsResult<()>;

    /// Issue a request and return the JSON body (`{}` for empty replies).
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> TeamsResult<Value>;
}

/// Deserialize a response body into `T`.
pub(crate) fn decode_body<T: DeserializeOwned>(value: Value) -> TeamsResult<T> {
    serde_json::from_value(value).map_err(|e| {
        TeamsError::Response(ResponseError::InvalidJson {
            message: e.to_string(),
        })
    })
}

/// Entry point bundling the domain services over one requester.
#[derive(Clone)]
pub struct TeamsClient {
    api: Arc<dyn ApiRequester>,
    users: UsersService,
}

impl TeamsClient {
    /// Create a client over any request contract implementation.
    pub fn new(api: Arc<dyn ApiRequester>) -> Self {
        Self {
            users: UsersService::new(api.clone()),
            api,
        }
    }

    /// Underlying requester.
    pub fn api(&self) -> &Arc<dyn ApiRequester> {
        &self.api
    }

    /// Users service. Shares its principal cache across calls.
    pub fn users(&self) -> UsersService {
        self.users.clone()
    }

    /// Teams and channels service.
    pub fn teams(&self) -> TeamsService {
        TeamsService::new(self.api.clone())
    }

    /// Chats service.
    pub fn chats(&self) -> ChatsService {
        ChatsService::new(self.api.clone(), self.users.clone())
    }
}

impl std::fmt::Debug for TeamsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeamsClient").finish_non_exhaustive()
    }
}

/// Recorded request made against a `MockApiRequester`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
}

/// Mock requester for testing services.
#[derive(Default)]
pub struct MockApiRequester {
    responses: Mutex<VecDeque<TeamsResult<Value>>>,
    history: Mutex<Vec<RecordedRequest>>,
}

impl MockApiRequester {
    /// Create new mock requester.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful body.
    pub fn queue_ok(&self, value: Value) -> &Self {
        self.responses.lock().push_back(Ok(value));
        self
    }

    /// Queue an error.
    pub fn queue_err(&self, error: TeamsError) -> &Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    /// Get request history.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.history.lock().clone()
    }

    /// Get last request.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.history.lock().last().cloned()
    }
}

#[async_trait]
impl ApiRequester for MockApiRequester {
    async fn ensure_fresh(&self) -> TeamsResult<()> {
        Ok(())
    }

    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> TeamsResult<Value> {
        self.history.lock().push(RecordedRequest {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });

        let queued = self.responses.lock().pop_front();
        queued.unwrap_or_else(|| {
            Err(TeamsError::Network(NetworkError::ConnectionFailed {
                message: format!("No mock response for {} {}", method, path),
            }))
        })
    }
}
