use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::{AppError, AppResult};

use super::batch::{self, BatchRequest, MAX_BATCH_REQUESTS};
use super::labels;
use super::messages;
use super::models::{CreateLabelRequest, LabelView, MessagePage};

const GMAIL_API_BASE_URL: &str = "https://gmail.googleapis.com";
const BATCH_ENDPOINT: &str = "/batch/gmail/v1";

#[derive(Debug, Clone)]
pub struct GmailClient {
    http: Client,
    base_url: String,
}

impl GmailClient {
    pub fn new() -> Self {
        Self::with_base_url(GMAIL_API_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Fetches one page of message ids.
    pub async fn list_page(
        &self,
        access_token: &str,
        max_results: u32,
        query: Option<&str>,
        page_token: Option<&str>,
    ) -> AppResult<MessagePage> {
        let params = messages::list_query(max_results, query, page_token);
        self.get_json(messages::list_endpoint(), access_token, Some(&params))
            .await
    }

    pub async fn list_labels(&self, access_token: &str) -> AppResult<Vec<LabelView>> {
        let response: GmailLabelListResponse = self
            .get_json(labels::labels_endpoint(), access_token, None)
            .await?;
        let mut labels_out = response.labels.unwrap_or_default();
        labels_out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(labels_out)
    }

    pub async fn create_label(&self, name: &str, access_token: &str) -> AppResult<LabelView> {
        let request = CreateLabelRequest::visible(name);
        self.post_json(labels::labels_endpoint(), access_token, &request)
            .await
    }

    /// Sends up to [`MAX_BATCH_REQUESTS`] sub-requests in one HTTP call.
    ///
    /// The outer `Result` fails when the batch call itself fails; the inner
    /// results, one per request and in request order, carry each
    /// sub-request's own outcome.
    pub async fn execute_batch<T: DeserializeOwned>(
        &self,
        requests: &[BatchRequest],
        access_token: &str,
    ) -> AppResult<Vec<AppResult<T>>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        if requests.len() > MAX_BATCH_REQUESTS {
            return Err(AppError::InvalidInput(format!(
                "a batch holds at most {MAX_BATCH_REQUESTS} requests, got {}",
                requests.len()
            )));
        }

        let boundary = batch::new_boundary();
        let body = batch::encode(&boundary, requests);
        let url = self.endpoint_url(BATCH_ENDPOINT)?;
        debug!(requests = requests.len(), "executing batch");

        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .header(CONTENT_TYPE, batch::content_type(&boundary))
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_api_error(status, &body));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.text().await?;

        let mut results: Vec<Option<AppResult<T>>> = requests.iter().map(|_| None).collect();
        for part in batch::decode(&content_type, &body)? {
            let Some(slot) = results.get_mut(part.index) else {
                trace!(index = part.index, "ignoring batch part without a matching request");
                continue;
            };
            *slot = Some(parse_batch_part(part.status, &part.body));
        }

        Ok(results
            .into_iter()
            .enumerate()
            .map(|(index, result)| {
                result.unwrap_or_else(|| {
                    Err(AppError::Batch(format!(
                        "no response for batch request {index}"
                    )))
                })
            })
            .collect())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        access_token: &str,
        query: Option<&[(String, String)]>,
    ) -> AppResult<T> {
        let request = self.http.get(self.endpoint_url(endpoint)?);
        let request = match query {
            Some(query) => request.query(query),
            None => request,
        };
        send(request.bearer_auth(access_token)).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        access_token: &str,
        body: &B,
    ) -> AppResult<T> {
        let request = self
            .http
            .post(self.endpoint_url(endpoint)?)
            .bearer_auth(access_token)
            .json(body);
        send(request).await
    }

    /// Resolves `endpoint` against the base url, dropping any path the base
    /// carries.
    fn endpoint_url(&self, endpoint: &str) -> AppResult<Url> {
        Ok(Url::parse(&self.base_url)?.join(endpoint)?)
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> AppResult<T> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(map_api_error(status, &body));
    }
    Ok(response.json().await?)
}

impl Default for GmailClient {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_batch_part<T: DeserializeOwned>(status: u16, body: &str) -> AppResult<T> {
    let status = StatusCode::from_u16(status)
        .map_err(|_| AppError::Batch(format!("invalid status {status} in batch part")))?;
    if !status.is_success() {
        return Err(map_api_error(status, body));
    }

    let body = if body.is_empty() { "null" } else { body };
    Ok(serde_json::from_str(body)?)
}

#[derive(Debug, Deserialize)]
struct GmailLabelListResponse {
    labels: Option<Vec<LabelView>>,
}

/// Google's `{"error": {...}}` body. Every field is optional in practice.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
    code: Option<u16>,
    status: Option<String>,
    message: Option<String>,
    errors: Vec<ErrorReason>,
}

#[derive(Debug, Deserialize)]
struct ErrorReason {
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

impl ErrorBody {
    /// `message, status=..., code=..., reason=...` with absent parts left out.
    fn summary(self) -> Option<String> {
        let reason = self.errors.into_iter().find_map(|detail| detail.reason);
        let parts: Vec<String> = [
            self.message,
            self.status.map(|status| format!("status={status}")),
            self.code.map(|code| format!("code={code}")),
            reason.map(|reason| format!("reason={reason}")),
        ]
        .into_iter()
        .flatten()
        .collect();

        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

fn map_api_error(status: StatusCode, body: &str) -> AppError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.summary())
        .unwrap_or_else(|| match body.trim() {
            "" => "no error details in response body".to_string(),
            body => body.to_string(),
        });

    if status == StatusCode::UNAUTHORIZED {
        return AppError::Auth(format!(
            "gmail rejected the access token ({status}): {message}. run `gmail-tidy auth login` to re-authorize"
        ));
    }

    AppError::Api {
        status: status.as_u16(),
        message,
    }
}
