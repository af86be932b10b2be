use std::collections::HashMap;

use tracing::info;

use crate::api::GmailClient;
use crate::api::models::LabelView;
use crate::error::AppResult;
use crate::fetch::{AccessTokenSource, BatchFetcher, BatchSummary};

/// Label name to id mapping, fetched once and kept current as labels are
/// created. Names are matched exactly; `parent/child` is just another name,
/// so a parent has to be ensured on its own.
#[derive(Debug, Clone, Default)]
pub struct LabelCache {
    ids_by_name: HashMap<String, String>,
}

impl LabelCache {
    pub fn from_labels(labels: impl IntoIterator<Item = LabelView>) -> Self {
        Self {
            ids_by_name: labels
                .into_iter()
                .map(|label| (label.name, label.id))
                .collect(),
        }
    }

    pub async fn fetch<S: AccessTokenSource>(client: &GmailClient, tokens: &S) -> AppResult<Self> {
        let access_token = tokens.access_token().await?;
        let labels = client.list_labels(&access_token).await?;
        Ok(Self::from_labels(labels))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.ids_by_name.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids_by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids_by_name.is_empty()
    }

    /// Returns the id for `name`, creating the label first when the cache
    /// does not know it.
    pub async fn ensure<S: AccessTokenSource>(
        &mut self,
        client: &GmailClient,
        tokens: &S,
        name: &str,
    ) -> AppResult<String> {
        if let Some(id) = self.get(name) {
            return Ok(id.to_string());
        }

        info!("label '{name}' not found, creating it");
        let access_token = tokens.access_token().await?;
        let created = client.create_label(name, &access_token).await?;
        info!("label '{name}' created with id {}", created.id);

        self.ids_by_name.insert(name.to_string(), created.id.clone());
        Ok(created.id)
    }
}

/// Adds `label_id` to every message in `ids` through the batched modify
/// endpoint. An empty `ids` makes no calls.
pub async fn apply_label<S: AccessTokenSource>(
    fetcher: &BatchFetcher<'_, S>,
    ids: &[String],
    label_id: &str,
) -> AppResult<BatchSummary> {
    if ids.is_empty() {
        return Ok(BatchSummary::default());
    }
    fetcher.add_label(ids, label_id).await
}
