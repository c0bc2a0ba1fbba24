//! Integration tests using WireMock
//!
//! Exercise the full HTTP path (reqwest transport, form encoding, header
//! handling) against a local mock of the identity platform and Graph.

mod device_flow;
mod graph_client;
mod notifications;

use chrono::{Duration as ChronoDuration, Utc};
use msteams_integration::core::{HttpTransport, ReqwestHttpTransport};
use msteams_integration::{
    DeviceCodeAuthenticator, GraphClient, InMemoryTokenStore, TeamsConfig, TokenInfo, TokenStore,
};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TENANT: &str = "contoso";
pub const TOKEN_PATH: &str = "/contoso/oauth2/v2.0/token";
pub const DEVICE_CODE_PATH: &str = "/contoso/oauth2/v2.0/devicecode";

/// Config pointing both the authority and Graph at the mock server.
pub fn config_for(server: &MockServer) -> Arc<TeamsConfig> {
    Arc::new(
        TeamsConfig::builder()
            .tenant_id(TENANT)
            .client_id("integration-client")
            .authority(server.uri())
            .graph_base_url(format!("{}/v1.0", server.uri()))
            .timeout(Duration::from_secs(5))
            .build()
            .expect("valid config"),
    )
}

pub fn transport() -> Arc<dyn HttpTransport> {
    Arc::new(ReqwestHttpTransport::new(Duration::from_secs(5)).expect("transport"))
}

/// Token with `access` as access token, expiring in `expires_in_secs`.
pub fn token(access: &str, expires_in_secs: i64) -> TokenInfo {
    TokenInfo::new(
        access,
        "refresh-0",
        Utc::now() + ChronoDuration::seconds(expires_in_secs),
    )
}

pub struct ClientFixture {
    pub client: GraphClient,
    pub store: Arc<InMemoryTokenStore>,
}

pub fn graph_client(server: &MockServer, initial: TokenInfo) -> ClientFixture {
    let config = config_for(server);
    let transport = transport();
    let authenticator = Arc::new(DeviceCodeAuthenticator::new(config.clone(), transport.clone()));
    let store = Arc::new(InMemoryTokenStore::new());
    let client = GraphClient::new(config, transport, authenticator, store.clone(), initial);
    ClientFixture { client, store }
}

/// Mount a refresh-token exchange returning `access`, expected `times` times.
pub async fn mount_refresh(server: &MockServer, access: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": access,
            "refresh_token": "refresh-1",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(times)
        .mount(server)
        .await;
}

pub async fn stored(store: &InMemoryTokenStore) -> Option<TokenInfo> {
    store.load().await.expect("in-memory load")
}
