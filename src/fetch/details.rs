use indicatif::ProgressBar;
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::api::GmailClient;
use crate::api::batch::BatchRequest;
use crate::api::labels::modify_labels_endpoint;
use crate::api::messages::{self, MessageFormat};
use crate::api::models::{MessageRecord, ModifyLabelsRequest};
use crate::config::FetchPolicy;
use crate::error::AppResult;

use super::AccessTokenSource;
use super::retry::execute_with_backoff;

/// What to do when a whole chunk still fails after retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkFailure {
    /// Abort the run with the chunk's error.
    Propagate,
    /// Log the error, count the chunk's ids as failed and move on.
    LogAndContinue,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub chunks: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failed_chunks: usize,
}

/// Runs per-message requests in fixed-size batches, pausing between chunks.
pub struct BatchFetcher<'a, S> {
    client: &'a GmailClient,
    tokens: &'a S,
    policy: FetchPolicy,
    on_chunk_failure: ChunkFailure,
    progress: ProgressBar,
}

impl<'a, S: AccessTokenSource> BatchFetcher<'a, S> {
    pub fn new(client: &'a GmailClient, tokens: &'a S, policy: FetchPolicy) -> Self {
        Self {
            client,
            tokens,
            policy,
            on_chunk_failure: ChunkFailure::Propagate,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn on_chunk_failure(mut self, on_chunk_failure: ChunkFailure) -> Self {
        self.on_chunk_failure = on_chunk_failure;
        self
    }

    /// The bar advances by one per id handled, successful or not.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Fetches every id in `format` and hands each message to `on_message` as
    /// soon as its chunk completes. Messages whose own sub-request failed are
    /// logged and skipped. An error from `on_message` aborts the run.
    pub async fn for_each_message<F>(
        &self,
        ids: &[String],
        format: &MessageFormat,
        mut on_message: F,
    ) -> AppResult<BatchSummary>
    where
        F: FnMut(MessageRecord) -> AppResult<()>,
    {
        let query = messages::get_query(format);
        self.run(
            ids,
            |id| Ok(BatchRequest::get(&messages::message_endpoint(id), &query)),
            |_, message: MessageRecord| on_message(message),
        )
        .await
    }

    /// Collects every message that could be fetched, in id order.
    pub async fn fetch_messages(
        &self,
        ids: &[String],
        format: &MessageFormat,
    ) -> AppResult<Vec<MessageRecord>> {
        let mut records = Vec::with_capacity(ids.len());
        self.for_each_message(ids, format, |message| {
            records.push(message);
            Ok(())
        })
        .await?;
        Ok(records)
    }

    /// Adds `label_id` to every message in `ids`.
    pub async fn add_label(&self, ids: &[String], label_id: &str) -> AppResult<BatchSummary> {
        let body = ModifyLabelsRequest::add(label_id);
        self.run(
            ids,
            |id| BatchRequest::post_json(&modify_labels_endpoint(id), &body),
            |_, _: IgnoredAny| Ok(()),
        )
        .await
    }

    async fn run<T, B, H>(&self, ids: &[String], build: B, mut handle: H) -> AppResult<BatchSummary>
    where
        T: DeserializeOwned,
        B: Fn(&str) -> AppResult<BatchRequest>,
        H: FnMut(&str, T) -> AppResult<()>,
    {
        let mut summary = BatchSummary::default();
        let batch_size = self.policy.batch_size.max(1);

        for chunk in ids.chunks(batch_size) {
            summary.chunks += 1;
            let requests = chunk
                .iter()
                .map(|id| build(id))
                .collect::<AppResult<Vec<_>>>()?;

            let client = self.client;
            let tokens = self.tokens;
            let requests = requests.as_slice();
            let outcome = execute_with_backoff(&self.policy.retry, "batch request", |_| async move {
                let access_token = tokens.access_token().await?;
                client.execute_batch::<T>(requests, &access_token).await
            })
            .await;

            match outcome {
                Ok(results) => {
                    for (id, result) in chunk.iter().zip(results) {
                        match result {
                            Ok(value) => {
                                handle(id, value)?;
                                summary.succeeded += 1;
                            }
                            Err(err) => {
                                warn!(id = %id, "error processing message {id}: {err}");
                                summary.failed += 1;
                            }
                        }
                    }
                }
                Err(err) => match self.on_chunk_failure {
                    ChunkFailure::Propagate => return Err(err),
                    ChunkFailure::LogAndContinue => {
                        error!(
                            chunk = summary.chunks,
                            size = chunk.len(),
                            "batch request failed: {err}. skipping chunk"
                        );
                        summary.failed += chunk.len();
                        summary.failed_chunks += 1;
                    }
                },
            }

            self.progress.inc(chunk.len() as u64);
            debug!(
                chunk = summary.chunks,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "batch chunk done"
            );
            sleep(self.policy.chunk_delay).await;
        }

        Ok(summary)
    }
}
