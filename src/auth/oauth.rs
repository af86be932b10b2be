use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{ClientConfig, CredentialSource};
use crate::error::{AppError, AppResult};

use super::callback::LoopbackServer;
use super::scope::Scope;
use super::token::TokenSet;
use super::token_store::TokenStore;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const REVOKE_URI: &str = "https://oauth2.googleapis.com/revoke";
const CONSENT_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Debug, Serialize)]
pub struct AuthStatus {
    pub scope: Scope,
    pub logged_in: bool,
    pub expired: Option<bool>,
    pub expires_in_seconds: Option<i64>,
    pub has_refresh_token: Option<bool>,
    pub note: Option<String>,
}

impl AuthStatus {
    fn logged_out(scope: Scope, note: impl Into<String>) -> Self {
        Self {
            scope,
            logged_in: false,
            expired: None,
            expires_in_seconds: None,
            has_refresh_token: None,
            note: Some(note.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct AuthService;

impl AuthService {
    /// Returns a usable token for `scope`: the stored one if still valid, a
    /// refreshed one if it expired, or a fresh one from the browser flow when
    /// nothing usable is stored. Only a refresh the token endpoint refused
    /// discards the stored token; transport failures propagate and keep it.
    pub async fn authorize<S: TokenStore>(
        scope: Scope,
        credentials: &CredentialSource,
        store: &S,
    ) -> AppResult<TokenSet> {
        match store.load(scope)? {
            Some(token) if !token.is_expired(SystemTime::now()) => {
                debug!(%scope, "using stored token");
                return Ok(token);
            }
            Some(token) if token.has_refresh_token() => {
                info!(%scope, "refreshing access token");
                match Self::refresh(&token).await {
                    Ok(refreshed) => {
                        store.save(scope, &refreshed)?;
                        return Ok(refreshed);
                    }
                    Err(err @ AppError::Auth(_)) => {
                        warn!(%scope, "token refresh refused, discarding stored token: {err}");
                        store.clear(scope)?;
                    }
                    Err(err) => return Err(err),
                }
            }
            _ => {}
        }

        Self::login(scope, credentials, store).await
    }

    /// Always runs the interactive browser flow and stores the result.
    pub async fn login<S: TokenStore>(
        scope: Scope,
        credentials: &CredentialSource,
        store: &S,
    ) -> AppResult<TokenSet> {
        let client = credentials.load()?;
        info!(%scope, credentials = %credentials.describe(), "starting browser authorization");

        let token = consent(scope, &client).await?;
        store.save(scope, &token)?;
        info!(%scope, "authorization complete, token stored");
        Ok(token)
    }

    /// Exchanges the refresh token for a new access token. The refresh token
    /// and client registration carry over when the response omits them.
    pub async fn refresh(current: &TokenSet) -> AppResult<TokenSet> {
        let refresh_token = current.refresh_token.as_deref().ok_or_else(|| {
            AppError::Auth("access token expired and no refresh token is stored".to_string())
        })?;
        let client_id = current.client_id.as_deref().ok_or_else(|| {
            AppError::Auth("stored token has no client_id to refresh with".to_string())
        })?;
        let token_uri = current.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);

        let request = TokenRequest {
            grant_type: "refresh_token",
            refresh_token: Some(refresh_token),
            client_id,
            client_secret: current.client_secret.as_deref(),
            ..TokenRequest::default()
        };
        let mut refreshed = request.send(token_uri).await?;

        refreshed.refresh_token = refreshed
            .refresh_token
            .or_else(|| Some(refresh_token.to_string()));
        refreshed.scope = refreshed.scope.or_else(|| current.scope.clone());
        refreshed.client_id = Some(client_id.to_string());
        refreshed.client_secret = current.client_secret.clone();
        refreshed.token_uri = Some(token_uri.to_string());
        Ok(refreshed)
    }

    pub async fn status<S: TokenStore>(scope: Scope, store: &S) -> AppResult<AuthStatus> {
        let Some(token) = store.load(scope)? else {
            return Ok(AuthStatus::logged_out(scope, "no token found"));
        };

        let now = SystemTime::now();
        Ok(AuthStatus {
            scope,
            logged_in: true,
            expired: Some(token.is_expired(now)),
            expires_in_seconds: token.expires_in_seconds(now),
            has_refresh_token: Some(token.has_refresh_token()),
            note: Some("token loaded from local store".to_string()),
        })
    }

    /// Removes the local token and asks Google to revoke it. A failed revoke
    /// is reported in the note but still clears the local file.
    pub async fn logout<S: TokenStore>(scope: Scope, store: &S) -> AppResult<AuthStatus> {
        let note = match store.load(scope)? {
            Some(token) => {
                let revocable = token.refresh_token.as_deref().unwrap_or(&token.access_token);
                match revoke(revocable).await {
                    Ok(()) => "remote token revoked and local token removed".to_string(),
                    Err(err) => format!("local token removed (revoke failed: {err})"),
                }
            }
            None => "local token removed".to_string(),
        };

        store.clear(scope)?;
        Ok(AuthStatus::logged_out(scope, note))
    }
}

/// Form body for the token endpoint. Unused grant fields are left out.
#[derive(Debug, Default, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_secret: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code_verifier: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_uri: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    token_type: Option<String>,
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

impl TokenRequest<'_> {
    async fn send(&self, token_uri: &str) -> AppResult<TokenSet> {
        let response = reqwest::Client::new()
            .post(token_uri)
            .form(self)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let reason = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(TokenErrorResponse {
                    error,
                    error_description: Some(description),
                }) => format!("{error} ({description})"),
                Ok(TokenErrorResponse { error, .. }) => error,
                Err(_) => body,
            };
            return Err(AppError::Auth(format!(
                "token endpoint rejected the {} grant ({status}): {reason}",
                self.grant_type
            )));
        }

        let payload: TokenResponse = serde_json::from_str(&body)?;
        Ok(TokenSet {
            access_token: payload.access_token,
            refresh_token: payload.refresh_token,
            expires_at_unix: payload.expires_in.and_then(unix_after),
            token_type: payload.token_type,
            scope: payload.scope,
            client_id: None,
            client_secret: None,
            token_uri: None,
        })
    }
}

fn unix_after(seconds: u64) -> Option<u64> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    Some(now.as_secs().saturating_add(seconds))
}

/// PKCE verifier plus the CSRF state for one consent round trip.
#[derive(Debug)]
struct Consent {
    state: String,
    code_verifier: String,
}

impl Consent {
    fn new() -> Self {
        Self {
            state: random_url_safe(32),
            code_verifier: random_url_safe(96),
        }
    }

    fn code_challenge(&self) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(self.code_verifier.as_bytes()))
    }

    fn authorization_url(
        &self,
        client: &ClientConfig,
        scope: Scope,
        redirect_uri: &str,
    ) -> AppResult<Url> {
        let mut url = Url::parse(&client.auth_uri)?;
        url.query_pairs_mut().extend_pairs([
            ("response_type", "code"),
            ("client_id", client.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", scope.url()),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("state", self.state.as_str()),
            ("code_challenge", self.code_challenge().as_str()),
            ("code_challenge_method", "S256"),
        ]);
        Ok(url)
    }
}

async fn consent(scope: Scope, client: &ClientConfig) -> AppResult<TokenSet> {
    let server = LoopbackServer::bind().await?;
    let redirect_uri = server.redirect_uri().to_string();

    let consent = Consent::new();
    let url = consent.authorization_url(client, scope, &redirect_uri)?;
    if !open_browser(url.as_str()) {
        eprintln!("Open this URL in your browser to authorize {scope} access:\n{url}");
    }

    let code = server.wait_for_code(&consent.state, CONSENT_TIMEOUT).await?;
    let request = TokenRequest {
        grant_type: "authorization_code",
        client_id: &client.client_id,
        client_secret: client.client_secret.as_deref(),
        code: Some(&code),
        code_verifier: Some(&consent.code_verifier),
        redirect_uri: Some(&redirect_uri),
        ..TokenRequest::default()
    };

    let mut token = request.send(&client.token_uri).await?;
    token.scope = token.scope.or_else(|| Some(scope.url().to_string()));
    token.client_id = Some(client.client_id.clone());
    token.client_secret = client.client_secret.clone();
    token.token_uri = Some(client.token_uri.clone());
    Ok(token)
}

async fn revoke(token: &str) -> AppResult<()> {
    let response = reqwest::Client::new()
        .post(REVOKE_URI)
        .form(&[("token", token)])
        .send()
        .await?;

    match response.status() {
        status if status.is_success() => Ok(()),
        status => Err(AppError::Auth(format!("revoke endpoint returned {status}"))),
    }
}

fn random_url_safe(len: usize) -> String {
    let mut bytes = vec![0_u8; len];
    rand::thread_rng().fill(bytes.as_mut_slice());
    URL_SAFE_NO_PAD.encode(bytes)
}

fn open_browser(url: &str) -> bool {
    let mut command = if cfg!(target_os = "macos") {
        std::process::Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut command = std::process::Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    } else {
        std::process::Command::new("xdg-open")
    };

    command
        .arg(url)
        .status()
        .is_ok_and(|status| status.success())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn client_config() -> ClientConfig {
        ClientConfig {
            client_id: "client-123".to_string(),
            client_secret: Some("secret".to_string()),
            auth_uri: "https://accounts.example.com/auth".to_string(),
            token_uri: "https://accounts.example.com/token".to_string(),
        }
    }

    #[test]
    fn authorization_url_requests_scope_and_offline_access() {
        let consent = Consent::new();
        let url = consent
            .authorization_url(&client_config(), Scope::Modify, "http://127.0.0.1:4567/")
            .expect("url");
        let pairs: HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.example.com"));
        assert_eq!(pairs["scope"], Scope::Modify.url());
        assert_eq!(pairs["access_type"], "offline");
        assert_eq!(pairs["redirect_uri"], "http://127.0.0.1:4567/");
        assert_eq!(pairs["state"], consent.state);
        assert_eq!(pairs["code_challenge"], consent.code_challenge());
    }

    #[test]
    fn refresh_form_omits_unused_fields() {
        let request = TokenRequest {
            grant_type: "refresh_token",
            client_id: "client-123",
            refresh_token: Some("r1"),
            ..TokenRequest::default()
        };
        let form = serde_json::to_value(&request).expect("serialize");

        assert_eq!(form["grant_type"], "refresh_token");
        assert!(form.get("client_secret").is_none());
        assert!(form.get("code").is_none());
    }

    #[test]
    fn verifier_is_long_enough_for_pkce() {
        let consent = Consent::new();
        assert!((43..=128).contains(&consent.code_verifier.len()));
        assert_ne!(consent.state, Consent::new().state);
    }
}
