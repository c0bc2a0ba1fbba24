//! Integration tests for the Graph request path

use super::*;
use msteams_integration::core::HttpMethod;
use msteams_integration::services::TeamsServiceTrait;
use msteams_integration::{TeamsClient, TeamsError};
use serde_json::json;
use wiremock::matchers::header;

#[tokio::test]
async fn test_401_refreshes_and_retries_with_new_bearer() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.0/me"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1.0/me"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "me-1"})))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "fresh", 1).await;

    let fixture = graph_client(&server, token("stale", 3600));
    let value = fixture
        .client
        .request(HttpMethod::Get, "/me", None)
        .await
        .unwrap();

    assert_eq!(value["id"], "me-1");
    let saved = stored(&fixture.store).await.unwrap();
    assert_eq!(saved.access_token(), "fresh");
    assert_eq!(saved.refresh_token(), "refresh-1");
}

#[tokio::test]
async fn test_second_401_surfaces_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.0/me"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    mount_refresh(&server, "fresh", 1).await;

    let fixture = graph_client(&server, token("stale", 3600));
    let err = fixture
        .client
        .request(HttpMethod::Get, "/me", None)
        .await
        .unwrap_err();

    assert!(matches!(err, TeamsError::Authentication { .. }));
    assert!(err.user_message().contains("msteams login"));
}

#[tokio::test]
async fn test_rate_limit_returns_retry_after_without_retrying() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.0/me/joinedTeams"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "42"))
        .expect(1)
        .mount(&server)
        .await;

    let fixture = graph_client(&server, token("valid", 3600));
    let err = TeamsClient::new(Arc::new(fixture.client))
        .teams()
        .list_joined_teams()
        .await
        .unwrap_err();

    match &err {
        TeamsError::RateLimit { retry_after } => assert_eq!(retry_after.as_deref(), Some("42")),
        other => panic!("Expected RateLimit, got {:?}", other),
    }
    assert_eq!(err.retry_after(), Some(Duration::from_secs(42)));
}

#[tokio::test]
async fn test_expiring_token_refreshed_once_before_send() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.0/me/joinedTeams"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"id": "t1", "displayName": "Platform"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "fresh", 1).await;

    let fixture = graph_client(&server, token("about-to-expire", 200));
    let teams = TeamsClient::new(Arc::new(fixture.client))
        .teams()
        .list_joined_teams()
        .await
        .unwrap();

    assert_eq!(teams.len(), 1);
    assert_eq!(stored(&fixture.store).await.unwrap().access_token(), "fresh");
}

#[tokio::test]
async fn test_rejected_refresh_is_token_refresh_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "AADSTS700082: The refresh token has expired"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1.0/me"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let fixture = graph_client(&server, token("expired", -10));
    let err = fixture
        .client
        .request(HttpMethod::Get, "/me", None)
        .await
        .unwrap_err();

    match err {
        TeamsError::TokenRefresh { message } => assert!(message.contains("AADSTS700082")),
        other => panic!("Expected TokenRefresh, got {:?}", other),
    }
    assert!(stored(&fixture.store).await.is_none());
}

#[tokio::test]
async fn test_no_content_reply() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v1.0/chats/c1/messages/m1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let fixture = graph_client(&server, token("valid", 3600));
    let value = fixture
        .client
        .request(HttpMethod::Delete, "/chats/c1/messages/m1", None)
        .await
        .unwrap();
    assert_eq!(value, json!({}));
}
