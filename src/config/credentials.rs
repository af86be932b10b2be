use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::info;

use crate::auth::secrets;
use crate::error::{AppError, AppResult};

pub const DEFAULT_CREDENTIALS_PATH: &str = "credentials.json";

const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Where the OAuth client secret comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    File(PathBuf),
    SecretReference(String),
}

impl CredentialSource {
    /// `op://vault/item/field` style values are secret references, anything
    /// else is treated as a path.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AppError::InvalidInput(
                "--creds must not be empty".to_string(),
            ));
        }

        let Some((scheme, _)) = raw.split_once("://") else {
            return Ok(Self::File(PathBuf::from(raw)));
        };

        if secrets::is_supported_scheme(scheme) {
            return Ok(Self::SecretReference(raw.to_string()));
        }

        if scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-') {
            return Err(AppError::Config(format!(
                "unsupported secret reference scheme `{scheme}://`"
            )));
        }

        Ok(Self::File(PathBuf::from(raw)))
    }

    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::SecretReference(reference) => reference.clone(),
        }
    }

    /// Reads the client secret. Secret references shell out to the secret
    /// manager CLI; files must exist.
    pub fn load(&self) -> AppResult<ClientConfig> {
        match self {
            Self::File(path) => {
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "credentials not found. provide a secret reference or make sure `{}` exists",
                        path.display()
                    )));
                }
                let raw = fs::read_to_string(path)?;
                ClientConfig::from_json(&raw)
            }
            Self::SecretReference(reference) => {
                info!(reference = %reference, "fetching gmail credentials from 1Password");
                let raw = secrets::read_secret(reference)?;
                ClientConfig::from_json(&raw)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecretEntry>,
    web: Option<ClientSecretEntry>,
}

#[derive(Debug, Deserialize)]
struct ClientSecretEntry {
    client_id: String,
    client_secret: Option<String>,
    auth_uri: Option<String>,
    token_uri: Option<String>,
}

/// OAuth client registration, as downloaded from the cloud console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub auth_uri: String,
    pub token_uri: String,
}

impl ClientConfig {
    pub fn from_json(raw: &str) -> AppResult<Self> {
        let file: ClientSecretFile = serde_json::from_str(raw).map_err(|err| {
            AppError::Config(format!(
                "the provided credentials content is not valid client secret JSON: {err}"
            ))
        })?;

        let entry = file.installed.or(file.web).ok_or_else(|| {
            AppError::Config(
                "client secret JSON has neither an `installed` nor a `web` section".to_string(),
            )
        })?;

        if entry.client_id.trim().is_empty() {
            return Err(AppError::Config(
                "client secret JSON has an empty client_id".to_string(),
            ));
        }

        Ok(Self {
            client_id: entry.client_id,
            client_secret: entry.client_secret.filter(|value| !value.trim().is_empty()),
            auth_uri: entry
                .auth_uri
                .unwrap_or_else(|| GOOGLE_AUTH_URI.to_string()),
            token_uri: entry
                .token_uri
                .unwrap_or_else(|| GOOGLE_TOKEN_URI.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_values_are_paths() {
        assert_eq!(
            CredentialSource::parse("credentials.json").expect("parse"),
            CredentialSource::File(PathBuf::from("credentials.json"))
        );
    }

    #[test]
    fn op_values_are_secret_references() {
        assert_eq!(
            CredentialSource::parse("op://Private/Gmail/credentials").expect("parse"),
            CredentialSource::SecretReference("op://Private/Gmail/credentials".to_string())
        );
    }

    #[test]
    fn rejects_unknown_secret_schemes() {
        let result = CredentialSource::parse("vault://secret/gmail");
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn parses_installed_client_secret() {
        let config = ClientConfig::from_json(
            r#"{"installed":{"client_id":"abc.apps.googleusercontent.com","client_secret":"s3cret","redirect_uris":["http://localhost"]}}"#,
        )
        .expect("client config");

        assert_eq!(config.client_id, "abc.apps.googleusercontent.com");
        assert_eq!(config.client_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.token_uri, GOOGLE_TOKEN_URI);
        assert_eq!(config.auth_uri, GOOGLE_AUTH_URI);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let result = ClientConfig::from_json("{not json");
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let source = CredentialSource::File(PathBuf::from("/definitely/not/here.json"));
        assert!(matches!(source.load(), Err(AppError::Config(_))));
    }
}
