use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::api::GmailClient;
use crate::auth::{AuthService, FileTokenStore, Scope, TokenStore};
use crate::config::{CredentialSource, FetchPolicy, TokenPaths};
use crate::error::{AppError, AppResult};
use crate::fetch::AccessTokenSource;
use crate::output::Output;

/// Everything a mailbox command needs: an authorized scope, the token store
/// backing it, the API client and where to report.
#[derive(Debug)]
pub struct AppContext {
    pub scope: Scope,
    pub token_store: FileTokenStore,
    pub gmail_client: GmailClient,
    pub output: Output,
    fetch_policy: Option<FetchPolicy>,
}

impl AppContext {
    pub fn new(
        scope: Scope,
        token_store: FileTokenStore,
        gmail_client: GmailClient,
        output: Output,
    ) -> Self {
        Self {
            scope,
            token_store,
            gmail_client,
            output,
            fetch_policy: None,
        }
    }

    /// Authorizes `scope` against the token files in the working directory,
    /// running the browser flow when no usable token exists.
    pub async fn bootstrap(creds: &str, scope: Scope, output: Output) -> AppResult<Self> {
        let credentials = CredentialSource::parse(creds)?;
        let token_store = FileTokenStore::new(TokenPaths::working_dir());
        AuthService::authorize(scope, &credentials, &token_store).await?;
        debug!(%scope, source = %credentials.describe(), "authorized");

        Ok(Self::new(scope, token_store, GmailClient::new(), output))
    }

    /// Pins the pacing used by every command, ignoring per-command chunk
    /// delays.
    pub fn with_fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.fetch_policy = Some(policy);
        self
    }

    pub fn fetch_policy(&self, chunk_delay: Duration) -> FetchPolicy {
        self.fetch_policy
            .unwrap_or_else(|| FetchPolicy::default().with_chunk_delay(chunk_delay))
    }
}

impl AccessTokenSource for AppContext {
    async fn access_token(&self) -> AppResult<String> {
        let scope = self.scope;
        let token = self.token_store.load(scope)?.ok_or_else(|| {
            AppError::Auth(format!(
                "no {scope} token stored. run `gmail-tidy auth login --scope {scope}`"
            ))
        })?;

        if token.is_expired(SystemTime::now()) {
            let refreshed = AuthService::refresh(&token).await?;
            self.token_store.save(scope, &refreshed)?;
            debug!(%scope, "refreshed access token mid-run");
            return Ok(refreshed.access_token);
        }

        Ok(token.access_token)
    }
}
