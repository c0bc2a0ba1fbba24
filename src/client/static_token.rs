//! Static-token client: same request contract, no renewal.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use super::graph::classify_response;
use super::ApiRequester;
use crate::core::{HttpMethod, HttpRequest, HttpTransport};
use crate::error::TeamsResult;

/// Client authenticated with a long-lived bearer token.
///
/// A 401 is final: there is nothing to refresh.
pub struct StaticTokenClient {
    base_url: String,
    token: SecretString,
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
}

impl StaticTokenClient {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            token: SecretString::new(token.into()),
            transport,
            timeout: Duration::from_secs(crate::DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ApiRequester for StaticTokenClient {
    async fn ensure_fresh(&self) -> TeamsResult<()> {
        Ok(())
    }

    #[instrument(skip(self, body), fields(method = %method, path = %path))]
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> TeamsResult<Value> {
        let mut request = HttpRequest::new(method, self.url(path))
            .header(
                "authorization",
                format!("Bearer {}", self.token.expose_secret()),
            )
            .header("accept", "application/json")
            .timeout(self.timeout);

        if let Some(body) = body {
            request = request
                .header("content-type", "application/json")
                .body(body.to_string());
        }

        let response = self.transport.send(request).await?;
        classify_response(response, path)
    }
}

impl std::fmt::Debug for StaticTokenClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenClient")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}
