#![allow(dead_code)]

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use gmail_tidy::api::GmailClient;
use gmail_tidy::auth::{FileTokenStore, Scope, TokenSet, TokenStore};
use gmail_tidy::config::{FetchPolicy, TokenPaths};
use gmail_tidy::context::AppContext;
use gmail_tidy::output::Output;
use serde_json::json;
use tempfile::TempDir;
use wiremock::{MockServer, ResponseTemplate};

pub const BATCH_PATH: &str = "/batch/gmail/v1";
pub const LIST_PATH: &str = "/gmail/v1/users/me/messages";
pub const LABELS_PATH: &str = "/gmail/v1/users/me/labels";
const RESPONSE_BOUNDARY: &str = "batch_response_test";

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

pub fn token(access_token: &str, expires_at_unix: u64) -> TokenSet {
    TokenSet {
        access_token: access_token.to_string(),
        refresh_token: Some("refresh-1".to_string()),
        expires_at_unix: Some(expires_at_unix),
        token_type: Some("Bearer".to_string()),
        scope: Some(Scope::ReadOnly.url().to_string()),
        client_id: Some("client-1".to_string()),
        client_secret: Some("secret-1".to_string()),
        token_uri: None,
    }
}

/// A context authorized for `scope` with a long-lived token in a temp dir,
/// talking to `server`, with no pacing delays and no console output.
pub fn context(server: &MockServer, scope: Scope) -> (AppContext, TempDir) {
    let dir = TempDir::new().expect("tempdir");
    let store = FileTokenStore::new(TokenPaths::in_dir(dir.path()));
    store
        .save(scope, &token("test-token", unix_now() + 3600))
        .expect("save token");

    let ctx = AppContext::new(
        scope,
        store,
        GmailClient::with_base_url(server.uri()),
        Output::quiet(),
    )
    .with_fetch_policy(FetchPolicy::immediate());
    (ctx, dir)
}

pub fn message_json(id: &str, headers: &[(&str, &str)]) -> serde_json::Value {
    let headers: Vec<_> = headers
        .iter()
        .map(|(name, value)| json!({"name": name, "value": value}))
        .collect();
    json!({
        "id": id,
        "threadId": format!("t-{id}"),
        "snippet": format!("snippet {id}"),
        "payload": {"mimeType": "text/plain", "headers": headers}
    })
}

/// Multipart batch reply; each part is `(request index, status, json body)`.
pub fn batch_reply(parts: &[(usize, u16, String)]) -> ResponseTemplate {
    let mut body = String::new();
    for (index, status, json) in parts {
        body.push_str(&format!("--{RESPONSE_BOUNDARY}\r\n"));
        body.push_str("Content-Type: application/http\r\n");
        body.push_str(&format!("Content-ID: <response-item-{index}>\r\n\r\n"));
        body.push_str(&format!("HTTP/1.1 {status} {}\r\n", reason(*status)));
        body.push_str("Content-Type: application/json; charset=UTF-8\r\n\r\n");
        body.push_str(json);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{RESPONSE_BOUNDARY}--\r\n"));

    ResponseTemplate::new(200).set_body_raw(
        body,
        &format!("multipart/mixed; boundary={RESPONSE_BOUNDARY}"),
    )
}

pub fn not_found_json() -> String {
    json!({"error": {"code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND"}})
        .to_string()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        429 => "Too Many Requests",
        _ => "Status",
    }
}
