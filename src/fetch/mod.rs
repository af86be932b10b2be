//! Paced, retrying access to the message listing and batch endpoints.

pub mod details;
pub mod listing;
pub mod retry;

use std::future::Future;

use crate::error::AppResult;

pub use details::{BatchFetcher, BatchSummary, ChunkFailure};
pub use listing::list_message_ids;
pub use retry::execute_with_backoff;

/// Hands out a bearer token for each remote call. Long runs outlive a single
/// access token, so fetchers ask again before every request.
pub trait AccessTokenSource {
    fn access_token(&self) -> impl Future<Output = AppResult<String>>;
}

/// A fixed token, for callers that already hold one.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> AppResult<String> {
        Ok(self.0.clone())
    }
}
