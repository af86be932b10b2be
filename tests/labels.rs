mod common;

use gmail_tidy::api::GmailClient;
use gmail_tidy::config::FetchPolicy;
use gmail_tidy::error::AppError;
use gmail_tidy::fetch::{BatchFetcher, StaticToken};
use gmail_tidy::labels::{LabelCache, apply_label};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{BATCH_PATH, LABELS_PATH, batch_reply, not_found_json};

fn token() -> StaticToken {
    StaticToken("test-token".to_string())
}

async fn mount_label_list(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(LABELS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "labels": [
                {"id": "INBOX", "name": "INBOX", "type": "system"},
                {"id": "Label_1", "name": "unsubscribe", "type": "user"}
            ]
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn ensure_uses_fetched_labels_without_creating() {
    let server = MockServer::start().await;
    mount_label_list(&server).await;
    Mock::given(method("POST"))
        .and(path(LABELS_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = GmailClient::with_base_url(server.uri());
    let tokens = token();
    let mut cache = LabelCache::fetch(&client, &tokens).await.expect("labels");

    assert_eq!(cache.len(), 2);
    let id = cache
        .ensure(&client, &tokens, "unsubscribe")
        .await
        .expect("ensure");
    assert_eq!(id, "Label_1");
}

#[tokio::test]
async fn ensure_creates_once_then_hits_the_cache() {
    let server = MockServer::start().await;
    mount_label_list(&server).await;
    Mock::given(method("POST"))
        .and(path(LABELS_PATH))
        .and(body_json(json!({
            "name": "unsubscribe/example.com",
            "labelListVisibility": "labelShow",
            "messageListVisibility": "show"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "Label_9",
            "name": "unsubscribe/example.com",
            "type": "user"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GmailClient::with_base_url(server.uri());
    let tokens = token();
    let mut cache = LabelCache::fetch(&client, &tokens).await.expect("labels");

    let first = cache
        .ensure(&client, &tokens, "unsubscribe/example.com")
        .await
        .expect("create");
    let second = cache
        .ensure(&client, &tokens, "unsubscribe/example.com")
        .await
        .expect("cached");

    assert_eq!(first, "Label_9");
    assert_eq!(second, "Label_9");
    assert_eq!(cache.get("unsubscribe/example.com"), Some("Label_9"));
}

#[tokio::test]
async fn failed_create_leaves_cache_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LABELS_PATH))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": {"code": 409, "message": "Label name exists or conflicts"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GmailClient::with_base_url(server.uri());
    let tokens = token();
    let mut cache = LabelCache::default();

    let result = cache.ensure(&client, &tokens, "INBOX").await;
    assert!(matches!(result, Err(AppError::Api { status: 409, .. })));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn applying_to_no_messages_makes_no_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(BATCH_PATH))
        .respond_with(batch_reply(&[]))
        .expect(0)
        .mount(&server)
        .await;

    let client = GmailClient::with_base_url(server.uri());
    let tokens = token();
    let fetcher = BatchFetcher::new(&client, &tokens, FetchPolicy::immediate());

    let summary = apply_label(&fetcher, &[], "Label_9").await.expect("apply");
    assert_eq!(summary.chunks, 0);
}

#[tokio::test]
async fn applies_label_through_batched_modify() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(BATCH_PATH))
        .and(body_string_contains(
            "POST /gmail/v1/users/me/messages/m1/modify HTTP/1.1",
        ))
        .and(body_string_contains(
            "POST /gmail/v1/users/me/messages/m2/modify HTTP/1.1",
        ))
        .and(body_string_contains(
            r#"{"addLabelIds":["Label_9"],"removeLabelIds":[]}"#,
        ))
        .respond_with(batch_reply(&[
            (0, 200, json!({"id": "m1", "labelIds": ["Label_9"]}).to_string()),
            (1, 404, not_found_json()),
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let client = GmailClient::with_base_url(server.uri());
    let tokens = token();
    let fetcher = BatchFetcher::new(&client, &tokens, FetchPolicy::immediate());

    let ids = vec!["m1".to_string(), "m2".to_string()];
    let summary = apply_label(&fetcher, &ids, "Label_9").await.expect("apply");

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
}
