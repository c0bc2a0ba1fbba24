//! Webhook and channel notifiers over real HTTP

use super::*;
use msteams_integration::{
    GraphChannelNotifier, Notification, NotificationLevel, Notifier, TeamsClient, TeamsError,
    WebhookNotifier,
};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header};

fn webhook(server: &MockServer) -> WebhookNotifier {
    WebhookNotifier::new(
        SecretString::new(format!("{}/webhookb2/incoming", server.uri())),
        transport(),
    )
}

#[tokio::test]
async fn test_webhook_posts_message_card() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhookb2/incoming"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "@type": "MessageCard",
            "themeColor": "DC3545",
            "summary": "Nightly build failed",
            "sections": [{
                "activitySubtitle": "via msteams | build",
                "facts": [{"name": "branch", "value": "main"}]
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("1"))
        .expect(1)
        .mount(&server)
        .await;

    let notification = Notification::new("build", "Nightly build failed")
        .field("branch", "main")
        .level(NotificationLevel::Error);

    webhook(&server).notify(&notification).await.unwrap();
}

#[tokio::test]
async fn test_webhook_rejection_surfaces_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhookb2/incoming"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Summary or Text is required."))
        .expect(1)
        .mount(&server)
        .await;

    let err = webhook(&server).send_message("").await.unwrap_err();
    match err {
        TeamsError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Summary or Text is required.");
        }
        other => panic!("Expected Api, got {:?}", other),
    }
}

#[tokio::test]
async fn test_channel_notifier_posts_html() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1.0/teams/t1/channels/c1/messages"))
        .and(header("authorization", "Bearer valid"))
        .and(body_partial_json(json!({"body": {"contentType": "html"}})))
        .and(body_string_contains("Deploy &lt;prod&gt;"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "m-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let fixture = graph_client(&server, token("valid", 3600));
    let teams = TeamsClient::new(Arc::new(fixture.client)).teams();
    let notifier = GraphChannelNotifier::new(teams, "t1", "c1");

    notifier
        .notify(&Notification::new("deploy", "Deploy <prod>"))
        .await
        .unwrap();
}
