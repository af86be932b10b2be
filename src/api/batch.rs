//! Wire codec for the multipart/mixed batch endpoint.
//!
//! A batch request carries one `application/http` part per sub-request. The
//! response mirrors it, tagging each part with `Content-ID:
//! <response-item-N>` so results can be matched back to the request that
//! produced them even if the server reorders parts.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use serde::Serialize;
use url::form_urlencoded;

use crate::error::{AppError, AppResult};

/// Upper bound the remote API accepts in a single batch.
pub const MAX_BATCH_REQUESTS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    method: &'static str,
    target: String,
    body: Option<String>,
}

impl BatchRequest {
    pub fn get(path: &str, query: &[(String, String)]) -> Self {
        let target = if query.is_empty() {
            path.to_string()
        } else {
            let encoded = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(query)
                .finish();
            format!("{path}?{encoded}")
        };

        Self {
            method: "GET",
            target,
            body: None,
        }
    }

    pub fn post_json<B: Serialize>(path: &str, body: &B) -> AppResult<Self> {
        Ok(Self {
            method: "POST",
            target: path.to_string(),
            body: Some(serde_json::to_string(body)?),
        })
    }
}

/// One decoded sub-response. `index` is the position of the originating
/// request in the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResponse {
    pub index: usize,
    pub status: u16,
    pub body: String,
}

pub fn new_boundary() -> String {
    let mut bytes = [0_u8; 12];
    rand::thread_rng().fill(&mut bytes);
    format!("batch_{}", URL_SAFE_NO_PAD.encode(bytes))
}

pub fn content_type(boundary: &str) -> String {
    format!("multipart/mixed; boundary={boundary}")
}

pub fn encode(boundary: &str, requests: &[BatchRequest]) -> String {
    let mut out = String::new();

    for (index, request) in requests.iter().enumerate() {
        out.push_str(&format!("--{boundary}\r\n"));
        out.push_str("Content-Type: application/http\r\n");
        out.push_str(&format!("Content-ID: <item-{index}>\r\n\r\n"));
        out.push_str(&format!("{} {} HTTP/1.1\r\n", request.method, request.target));

        match &request.body {
            Some(body) => {
                out.push_str("Content-Type: application/json; charset=UTF-8\r\n");
                out.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));
                out.push_str(body);
                out.push_str("\r\n");
            }
            None => out.push_str("\r\n"),
        }
    }

    out.push_str(&format!("--{boundary}--\r\n"));
    out
}

pub fn decode(content_type: &str, body: &str) -> AppResult<Vec<BatchResponse>> {
    let boundary = boundary_from_content_type(content_type).ok_or_else(|| {
        AppError::Batch(format!(
            "batch response content-type has no boundary: {content_type}"
        ))
    })?;
    let delimiter = format!("--{boundary}");

    let mut responses = Vec::new();
    for (position, part) in body.split(delimiter.as_str()).skip(1).enumerate() {
        if part.starts_with("--") {
            break;
        }

        let normalized = part.replace("\r\n", "\n");
        let normalized = normalized.trim_start_matches('\n');
        let Some((part_headers, http)) = normalized.split_once("\n\n") else {
            return Err(AppError::Batch(format!(
                "batch response part {position} has no embedded http response"
            )));
        };

        let index = content_id_index(part_headers).unwrap_or(position);
        let http = http.trim_start();
        let (status_line, rest) = http.split_once('\n').unwrap_or((http, ""));
        let status = parse_status_line(status_line)?;
        let body = rest
            .split_once("\n\n")
            .map(|(_, body)| body)
            .unwrap_or_default()
            .trim();

        responses.push(BatchResponse {
            index,
            status,
            body: body.to_string(),
        });
    }

    Ok(responses)
}

fn boundary_from_content_type(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| {
            part.trim()
                .strip_prefix("boundary=")
                .map(|value| value.trim_matches('"').to_string())
        })
        .find(|boundary| !boundary.is_empty())
}

fn content_id_index(headers: &str) -> Option<usize> {
    headers.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if !name.trim().eq_ignore_ascii_case("content-id") {
            return None;
        }

        value
            .trim()
            .trim_start_matches('<')
            .trim_end_matches('>')
            .strip_prefix("response-")?
            .strip_prefix("item-")?
            .parse()
            .ok()
    })
}

fn parse_status_line(line: &str) -> AppResult<u16> {
    line.split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| AppError::Batch(format!("malformed status line in batch part: {line}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::ModifyLabelsRequest;

    #[test]
    fn encodes_get_and_post_parts() {
        let requests = vec![
            BatchRequest::get(
                "/gmail/v1/users/me/messages/abc",
                &[
                    ("format".to_string(), "metadata".to_string()),
                    ("metadataHeaders".to_string(), "List-Unsubscribe".to_string()),
                ],
            ),
            BatchRequest::post_json(
                "/gmail/v1/users/me/messages/def/modify",
                &ModifyLabelsRequest::add("Label_1"),
            )
            .expect("request"),
        ];

        let body = encode("b1", &requests);

        assert!(body.starts_with("--b1\r\nContent-Type: application/http\r\n"));
        assert!(body.contains("Content-ID: <item-0>"));
        assert!(body.contains(
            "GET /gmail/v1/users/me/messages/abc?format=metadata&metadataHeaders=List-Unsubscribe HTTP/1.1\r\n"
        ));
        assert!(body.contains("Content-ID: <item-1>"));
        assert!(body.contains("POST /gmail/v1/users/me/messages/def/modify HTTP/1.1\r\n"));
        assert!(body.contains(r#"{"addLabelIds":["Label_1"],"removeLabelIds":[]}"#));
        assert!(body.ends_with("--b1--\r\n"));
    }

    #[test]
    fn decodes_parts_by_content_id() {
        let body = concat!(
            "--batch_x\r\n",
            "Content-Type: application/http\r\n",
            "Content-ID: <response-item-1>\r\n",
            "\r\n",
            "HTTP/1.1 404 Not Found\r\n",
            "Content-Type: application/json; charset=UTF-8\r\n",
            "\r\n",
            "{\"error\": {\"code\": 404, \"message\": \"Requested entity was not found.\"}}\r\n",
            "--batch_x\r\n",
            "Content-Type: application/http\r\n",
            "Content-ID: <response-item-0>\r\n",
            "\r\n",
            "HTTP/1.1 200 OK\r\n",
            "Content-Type: application/json; charset=UTF-8\r\n",
            "\r\n",
            "{\"id\": \"abc\"}\r\n",
            "--batch_x--\r\n",
        );

        let responses = decode("multipart/mixed; boundary=batch_x", body).expect("decode");

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].index, 1);
        assert_eq!(responses[0].status, 404);
        assert_eq!(responses[1].index, 0);
        assert_eq!(responses[1].status, 200);
        assert_eq!(responses[1].body, "{\"id\": \"abc\"}");
    }

    #[test]
    fn falls_back_to_position_without_content_id() {
        let body = "--q\nContent-Type: application/http\n\nHTTP/1.1 204 No Content\n\n--q--";
        let responses = decode("multipart/mixed; boundary=\"q\"", body).expect("decode");

        assert_eq!(
            responses,
            vec![BatchResponse {
                index: 0,
                status: 204,
                body: String::new(),
            }]
        );
    }

    #[test]
    fn rejects_content_type_without_boundary() {
        let result = decode("application/json", "{}");
        assert!(matches!(result, Err(AppError::Batch(_))));
    }

    #[test]
    fn boundaries_are_header_safe() {
        let boundary = new_boundary();
        assert!(boundary.starts_with("batch_"));
        assert!(
            boundary
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        );
    }
}
