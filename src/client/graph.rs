//! Graph Client
//!
//! Authenticated request path for the Graph API: proactive refresh, bearer
//! auth, failure classification and a single refresh-and-retry on 401.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::{decode_body, ApiRequester};
use crate::config::TeamsConfig;
use crate::core::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::error::{ResponseError, TeamsError, TeamsResult};
use crate::flows::TokenRefresher;
use crate::token::TokenStore;
use crate::types::TokenInfo;

/// Graph API client owning one refreshable credential.
///
/// Refreshes are single-flight: concurrent callers that observe the same
/// stale token share one refresh exchange.
pub struct GraphClient {
    config: Arc<TeamsConfig>,
    transport: Arc<dyn HttpTransport>,
    refresher: Arc<dyn TokenRefresher>,
    store: Arc<dyn TokenStore>,
    token: RwLock<TokenInfo>,
    refresh_gate: Mutex<()>,
}

impl GraphClient {
    /// Create a client holding `token`.
    pub fn new(
        config: Arc<TeamsConfig>,
        transport: Arc<dyn HttpTransport>,
        refresher: Arc<dyn TokenRefresher>,
        store: Arc<dyn TokenStore>,
        token: TokenInfo,
    ) -> Self {
        Self {
            config,
            transport,
            refresher,
            store,
            token: RwLock::new(token),
            refresh_gate: Mutex::new(()),
        }
    }

    /// Snapshot of the current credential.
    pub fn token_info(&self) -> TokenInfo {
        self.token.read().clone()
    }

    pub fn config(&self) -> &TeamsConfig {
        &self.config
    }

    fn is_stale(&self) -> bool {
        self.token.read().needs_refresh(self.config.skew_buffer)
    }

    /// Refresh if the token is inside the skew buffer. No-op otherwise.
    #[instrument(skip(self))]
    pub async fn ensure_fresh(&self) -> TeamsResult<()> {
        if !self.is_stale() {
            return Ok(());
        }

        let _gate = self.refresh_gate.lock().await;
        // Another caller may have refreshed while we waited.
        if !self.is_stale() {
            debug!("Token refreshed by a concurrent caller");
            return Ok(());
        }

        let remaining_secs = self.token.read().remaining_lifetime().as_secs();
        info!(remaining_secs, "Access token near expiry, refreshing");
        self.refresh_and_store().await
    }

    /// Refresh after the server rejected `rejected_access`.
    async fn refresh_rejected(&self, rejected_access: &str) -> TeamsResult<()> {
        let _gate = self.refresh_gate.lock().await;
        let current_access = self.token.read().access_token().to_string();
        if current_access != rejected_access {
            debug!("Rejected token already replaced by a concurrent caller");
            return Ok(());
        }

        self.refresh_and_store().await
    }

    /// Caller must hold `refresh_gate`.
    async fn refresh_and_store(&self) -> TeamsResult<()> {
        let current = self.token_info();
        if !current.has_refresh_token() {
            return Err(TeamsError::TokenRefresh {
                message: "No refresh token held, run 'msteams login'".to_string(),
            });
        }

        let fresh = self.refresher.refresh(current.refresh_token()).await?;

        *self.token.write() = fresh.clone();
        self.store.save(&fresh).await?;

        debug!(expires_at = %fresh.expires_at(), "Stored refreshed token");
        Ok(())
    }

    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        token: &TokenInfo,
    ) -> TeamsResult<HttpResponse> {
        let mut request = HttpRequest::new(method, self.config.graph_url(path))
            .header("authorization", token.authorization_header())
            .header("accept", "application/json")
            .timeout(self.config.timeout);

        if let Some(body) = body {
            request = request
                .header("content-type", "application/json")
                .body(body.to_string());
        }

        self.transport.send(request).await
    }

    /// Issue an authenticated request and return the decoded JSON body.
    ///
    /// A 401 triggers one refresh and one re-send; a second 401 is returned
    /// as `Authentication`.
    #[instrument(skip(self, body), fields(method = %method, path = %path))]
    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> TeamsResult<Value> {
        self.ensure_fresh().await?;

        let mut retry_on_401 = true;
        loop {
            let token = self.token_info();
            let response = self.send(method, path, body, &token).await?;

            if response.status == 401 && retry_on_401 {
                warn!("Access token rejected, refreshing once");
                self.refresh_rejected(token.access_token()).await?;
                retry_on_401 = false;
                continue;
            }

            return classify_response(response, path);
        }
    }

    /// Issue a request and deserialize the body into `T`.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> TeamsResult<T> {
        let value = self.request(method, path, body).await?;
        decode_body(value)
    }
}

/// Map a Graph response to its JSON body or a typed error.
pub(crate) fn classify_response(response: HttpResponse, path: &str) -> TeamsResult<Value> {
    if response.is_success() {
        if response.status == 204 || response.body.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        return serde_json::from_str(&response.body).map_err(|e| {
            TeamsError::Response(ResponseError::InvalidJson {
                message: e.to_string(),
            })
        });
    }

    let error = TeamsError::from_response(
        response.status,
        response.header("retry-after"),
        &response.body,
        path,
    );
    debug!(status = response.status, code = error.error_code(), "Graph request failed");
    Err(error)
}

#[async_trait]
impl ApiRequester for GraphClient {
    async fn ensure_fresh(&self) -> TeamsResult<()> {
        GraphClient::ensure_fresh(self).await
    }

    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> TeamsResult<Value> {
        GraphClient::request(self, method, path, body).await
    }
}

impl std::fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClient")
            .field("graph_base_url", &self.config.graph_base_url)
            .field("token", &*self.token.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MockHttpTransport;
    use crate::token::MockTokenStore;
    use chrono::{Duration as ChronoDuration, Utc};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Refresher that counts calls and hands out numbered tokens.
    #[derive(Default)]
    struct CountingRefresher {
        calls: AtomicUsize,
        delay: Option<Duration>,
        fail: bool,
    }

    #[async_trait]
    impl TokenRefresher for CountingRefresher {
        async fn refresh(&self, refresh_token: &str) -> TeamsResult<TokenInfo> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(TeamsError::TokenRefresh {
                    message: "invalid_grant".into(),
                });
            }
            assert!(!refresh_token.is_empty());
            Ok(TokenInfo::new(
                format!("fresh-{}", n),
                format!("refresh-{}", n),
                Utc::now() + ChronoDuration::hours(1),
            ))
        }
    }

    impl CountingRefresher {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    struct Harness {
        client: Arc<GraphClient>,
        transport: Arc<MockHttpTransport>,
        refresher: Arc<CountingRefresher>,
        store: Arc<MockTokenStore>,
    }

    fn harness_with(expires_in_secs: i64, refresher: CountingRefresher) -> Harness {
        let config = Arc::new(
            TeamsConfig::builder()
                .tenant_id("contoso")
                .client_id("app")
                .graph_base_url("https://graph.test/v1.0")
                .build()
                .unwrap(),
        );
        let transport = Arc::new(MockHttpTransport::new());
        let refresher = Arc::new(refresher);
        let store = Arc::new(MockTokenStore::new());
        let token = TokenInfo::new(
            "initial",
            "refresh-0",
            Utc::now() + ChronoDuration::seconds(expires_in_secs),
        );
        let client = Arc::new(GraphClient::new(
            config,
            transport.clone(),
            refresher.clone(),
            store.clone(),
            token,
        ));
        Harness {
            client,
            transport,
            refresher,
            store,
        }
    }

    fn harness(expires_in_secs: i64) -> Harness {
        harness_with(expires_in_secs, CountingRefresher::default())
    }

    fn bearer(request: &HttpRequest) -> Option<&str> {
        request.headers.get("authorization").map(String::as_str)
    }

    #[tokio::test]
    async fn test_fresh_token_sends_without_refresh() {
        let h = harness(3600);
        h.transport.queue_json(200, json!({"id": "me"}));

        let value = h.client.request(HttpMethod::Get, "/me", None).await.unwrap();

        assert_eq!(value["id"], "me");
        assert_eq!(h.refresher.calls(), 0);
        assert_eq!(h.store.save_count(), 0);
        let request = h.transport.last_request().unwrap();
        assert_eq!(request.url, "https://graph.test/v1.0/me");
        assert_eq!(bearer(&request), Some("Bearer initial"));
    }

    #[tokio::test]
    async fn test_ensure_fresh_is_noop_outside_buffer() {
        let h = harness(301);
        h.client.ensure_fresh().await.unwrap();
        assert_eq!(h.refresher.calls(), 0);
        assert_eq!(h.store.save_count(), 0);
        assert!(h.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_expiring_token_refreshed_before_send() {
        let h = harness(200);
        h.transport.queue_json(200, json!({"value": []}));

        h.client
            .request(HttpMethod::Get, "/me/joinedTeams", None)
            .await
            .unwrap();

        assert_eq!(h.refresher.calls(), 1);
        assert_eq!(h.store.save_count(), 1);
        assert_eq!(h.store.save_history()[0].access_token(), "fresh-1");
        assert_eq!(h.transport.requests().len(), 1);
        assert_eq!(
            bearer(&h.transport.last_request().unwrap()),
            Some("Bearer fresh-1")
        );
    }

    #[tokio::test]
    async fn test_401_refreshes_and_retries_once() {
        let h = harness(3600);
        h.transport.queue_status(401);
        h.transport.queue_json(200, json!({"id": "me"}));

        let value = h.client.request(HttpMethod::Get, "/me", None).await.unwrap();

        assert_eq!(value["id"], "me");
        assert_eq!(h.refresher.calls(), 1);
        assert_eq!(h.store.save_count(), 1);
        let requests = h.transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(bearer(&requests[0]), Some("Bearer initial"));
        assert_eq!(bearer(&requests[1]), Some("Bearer fresh-1"));
        assert_eq!(h.client.token_info().refresh_token(), "refresh-1");
    }

    #[tokio::test]
    async fn test_second_401_is_authentication_error() {
        let h = harness(3600);
        h.transport.queue_status(401);
        h.transport.queue_status(401);
        h.transport.set_default_response(HttpResponse::new(200, "{}"));

        let err = h
            .client
            .request(HttpMethod::Get, "/me", None)
            .await
            .unwrap_err();

        assert!(matches!(err, TeamsError::Authentication { .. }));
        assert_eq!(h.transport.count_requests_to("/me"), 2);
        assert_eq!(h.refresher.calls(), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_on_401_propagates() {
        let h = harness_with(
            3600,
            CountingRefresher {
                fail: true,
                ..Default::default()
            },
        );
        h.transport.queue_status(401);

        let err = h
            .client
            .request(HttpMethod::Get, "/me", None)
            .await
            .unwrap_err();

        assert!(matches!(err, TeamsError::TokenRefresh { .. }));
        assert!(err.needs_reauth());
        assert_eq!(h.transport.requests().len(), 1);
        assert_eq!(h.store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_is_not_retried() {
        let h = harness(3600);
        h.transport
            .queue_response(HttpResponse::new(429, "").with_header("Retry-After", "42"));

        let err = h
            .client
            .request(HttpMethod::Get, "/me", None)
            .await
            .unwrap_err();

        match err {
            TeamsError::RateLimit { retry_after } => assert_eq!(retry_after.as_deref(), Some("42")),
            other => panic!("Expected RateLimit, got {:?}", other),
        }
        assert_eq!(h.transport.requests().len(), 1);
        assert_eq!(h.refresher.calls(), 0);
    }

    #[tokio::test]
    async fn test_status_classification() {
        let h = harness(3600);
        h.transport.queue_status(404);
        h.transport.queue_json(403, json!({"error": {"code": "Forbidden", "message": "Missing role"}}));
        h.transport.queue_json(500, json!({"error": {"code": "InternalServerError", "message": "boom"}}));

        let not_found = h.client.request(HttpMethod::Get, "/teams/x", None).await;
        assert!(matches!(not_found, Err(TeamsError::NotFound { ref resource }) if resource == "/teams/x"));

        let forbidden = h.client.request(HttpMethod::Get, "/me/chats", None).await;
        assert!(matches!(forbidden, Err(TeamsError::PermissionDenied { ref message }) if message == "Missing role"));

        let server = h.client.request(HttpMethod::Get, "/me", None).await;
        assert!(matches!(server, Err(TeamsError::Api { status: 500, ref message }) if message == "boom"));
    }

    #[tokio::test]
    async fn test_no_content_is_empty_object() {
        let h = harness(3600);
        h.transport.queue_status(204);
        h.transport.queue_status(202);

        let deleted = h
            .client
            .request(HttpMethod::Delete, "/chats/1/messages/2", None)
            .await
            .unwrap();
        assert_eq!(deleted, json!({}));

        let accepted = h
            .client
            .request(HttpMethod::Post, "/chats", Some(&json!({"chatType": "oneOnOne"})))
            .await
            .unwrap();
        assert_eq!(accepted, json!({}));

        let post = h.transport.last_request().unwrap();
        assert_eq!(post.body.as_deref(), Some(r#"{"chatType":"oneOnOne"}"#));
        assert_eq!(
            post.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
    }

    #[tokio::test]
    async fn test_save_failure_after_refresh_propagates() {
        let h = harness(60);
        h.store.fail_next_save();
        h.transport.set_default_response(HttpResponse::new(200, "{}"));

        let err = h
            .client
            .request(HttpMethod::Get, "/me", None)
            .await
            .unwrap_err();

        assert!(matches!(err, TeamsError::Storage(_)));
        assert!(h.transport.requests().is_empty());
        // The refreshed token is still held for the next call.
        assert_eq!(h.client.token_info().access_token(), "fresh-1");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_refresh() {
        let h = harness_with(
            10,
            CountingRefresher {
                delay: Some(Duration::from_millis(50)),
                ..Default::default()
            },
        );
        h.transport.set_default_response(HttpResponse::new(200, r#"{"ok":true}"#));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let client = h.client.clone();
            handles.push(tokio::spawn(async move {
                client.request(HttpMethod::Get, "/me", None).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(h.refresher.calls(), 1);
        assert_eq!(h.store.save_count(), 1);
        assert_eq!(h.transport.requests().len(), 8);
    }

    #[tokio::test]
    async fn test_concurrent_401s_share_one_refresh() {
        let h = harness_with(
            3600,
            CountingRefresher {
                delay: Some(Duration::from_millis(50)),
                ..Default::default()
            },
        );
        h.transport.queue_status(401);
        h.transport.queue_status(401);
        h.transport.set_default_response(HttpResponse::new(200, "{}"));

        let (a, b) = tokio::join!(
            h.client.request(HttpMethod::Get, "/me", None),
            h.client.request(HttpMethod::Get, "/me/chats", None)
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(h.refresher.calls(), 1);
        assert_eq!(h.transport.requests().len(), 4);
    }

    #[tokio::test]
    async fn test_missing_refresh_token_skips_exchange() {
        let h = harness(3600);
        *h.client.token.write() =
            TokenInfo::new("initial", "", Utc::now() - ChronoDuration::seconds(1));

        let err = h.client.request(HttpMethod::Get, "/me", None).await.unwrap_err();

        assert!(matches!(err, TeamsError::TokenRefresh { .. }));
        assert_eq!(h.refresher.calls(), 0);
        assert!(h.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_request_json_decodes() {
        #[derive(serde::Deserialize)]
        struct Me {
            id: String,
        }

        let h = harness(3600);
        h.transport.queue_json(200, json!({"id": "abc"}));
        let me: Me = h.client.request_json(HttpMethod::Get, "/me", None).await.unwrap();
        assert_eq!(me.id, "abc");
    }
}
