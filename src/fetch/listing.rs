use indicatif::ProgressBar;
use tokio::time::sleep;
use tracing::{debug, error};

use crate::api::GmailClient;
use crate::config::FetchPolicy;
use crate::error::AppResult;

use super::AccessTokenSource;

/// Walks the message listing page by page and collects ids in listing order.
///
/// Stops once `limit` ids are collected (the result is truncated to exactly
/// `limit`) or when no next page token is returned. A failing page is logged
/// and ends the walk; ids gathered before it are still returned. Only failing
/// to obtain an access token is reported as an error.
pub async fn list_message_ids<S: AccessTokenSource>(
    client: &GmailClient,
    tokens: &S,
    policy: &FetchPolicy,
    query: Option<&str>,
    limit: Option<usize>,
    progress: &ProgressBar,
) -> AppResult<Vec<String>> {
    let mut ids: Vec<String> = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0_usize;

    loop {
        let access_token = tokens.access_token().await?;
        let page_size = match limit {
            Some(limit) => limit
                .saturating_sub(ids.len())
                .min(policy.page_size as usize) as u32,
            None => policy.page_size,
        };

        let page = match client
            .list_page(&access_token, page_size, query, page_token.as_deref())
            .await
        {
            Ok(page) => page,
            Err(err) => {
                error!(
                    collected = ids.len(),
                    "error while listing messages: {err}. continuing with ids fetched so far"
                );
                break;
            }
        };

        pages += 1;
        ids.extend(page.messages.into_iter().map(|message| message.id));
        progress.set_message(format!("Fetched {} message ids", ids.len()));
        progress.tick();
        debug!(page = pages, total = ids.len(), "listed message page");

        if limit.is_some_and(|limit| ids.len() >= limit) {
            break;
        }

        page_token = page.next_page_token;
        if page_token.is_none() {
            break;
        }

        sleep(policy.page_delay).await;
    }

    if let Some(limit) = limit {
        ids.truncate(limit);
    }

    Ok(ids)
}
