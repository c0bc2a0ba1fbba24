//! Device authorization grant against a mocked identity platform

use super::*;
use msteams_integration::{AuthStatus, AuthorizationState, FileTokenStore, TeamsError, TeamsSession};
use parking_lot::Mutex;
use serde_json::json;
use tokio_util::sync::CancellationToken;

async fn mount_device_code(server: &MockServer, expires_in: u64) {
    Mock::given(method("POST"))
        .and(path(DEVICE_CODE_PATH))
        .and(body_string_contains("client_id=integration-client"))
        .and(body_string_contains("offline_access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "device_code": "device-123",
            "user_code": "ABCD-EFGH",
            "verification_uri": "https://microsoft.com/devicelogin",
            "expires_in": expires_in,
            "interval": 0,
            "message": "To sign in, use a web browser to open the page"
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_pending(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("device_code=device-123"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "authorization_pending",
            "error_description": "AADSTS70016: Pending end-user authorization"
        })))
        .up_to_n_times(times)
        .with_priority(1)
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_device_success(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("device_code=device-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "device-access",
            "refresh_token": "device-refresh",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .with_priority(2)
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_device_flow_polls_until_authorized() {
    let server = MockServer::start().await;
    mount_device_code(&server, 900).await;
    mount_pending(&server, 2).await;
    mount_device_success(&server).await;

    let authenticator = DeviceCodeAuthenticator::new(config_for(&server), transport());
    let shown = Mutex::new(None);

    let token = authenticator
        .authenticate(
            |code, uri| *shown.lock() = Some((code.to_string(), uri.to_string())),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(token.access_token(), "device-access");
    assert_eq!(token.refresh_token(), "device-refresh");
    assert!(!token.is_expired());
    assert_eq!(
        shown.lock().clone(),
        Some((
            "ABCD-EFGH".to_string(),
            "https://microsoft.com/devicelogin".to_string()
        ))
    );
    assert_eq!(authenticator.state(), AuthorizationState::Authorized);
}

#[tokio::test]
async fn test_declined_authorization() {
    let server = MockServer::start().await;
    mount_device_code(&server, 900).await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "authorization_declined",
            "error_description": "AADSTS70000: The user declined"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let authenticator = DeviceCodeAuthenticator::new(config_for(&server), transport());
    let err = authenticator
        .authenticate(|_, _| {}, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TeamsError::Authentication { .. }));
    assert_eq!(authenticator.state(), AuthorizationState::Declined);
}

#[tokio::test]
async fn test_device_code_request_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(DEVICE_CODE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("AADSTS700016: unknown client"))
        .expect(1)
        .mount(&server)
        .await;

    let authenticator = DeviceCodeAuthenticator::new(config_for(&server), transport());
    let err = authenticator.initiate().await.unwrap_err();

    match err {
        TeamsError::Authentication { message } => {
            assert!(message.starts_with("Failed to get device code"));
            assert!(message.contains("AADSTS700016"));
        }
        other => panic!("Expected Authentication, got {:?}", other),
    }
}

#[tokio::test]
async fn test_session_login_persists_and_status_reads_back() {
    let server = MockServer::start().await;
    mount_device_code(&server, 900).await;
    mount_pending(&server, 1).await;
    mount_device_success(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1.0/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user-1",
            "displayName": "Ada Lovelace",
            "mail": "ada@contoso.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("nested").join("tokens.json");
    let store = Arc::new(FileTokenStore::new(token_file.clone()));
    let session = TeamsSession::new(config_for(&server), transport(), store.clone());

    assert_eq!(session.status().await.unwrap(), AuthStatus::NotAuthenticated);

    session
        .login(|_, _| {}, &CancellationToken::new())
        .await
        .unwrap();
    assert!(token_file.exists());

    let reloaded = FileTokenStore::new(token_file.clone())
        .load()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.access_token(), "device-access");

    match session.status().await.unwrap() {
        AuthStatus::Authenticated(user) => {
            assert_eq!(user.display_name, "Ada Lovelace");
            assert_eq!(user.address(), Some("ada@contoso.com"));
        }
        other => panic!("Expected Authenticated, got {:?}", other),
    }

    assert!(session.logout().await.unwrap());
    assert!(!token_file.exists());
}
