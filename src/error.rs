use std::io;

use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Status codes the remote API uses for rate limiting and temporary outages.
pub const TRANSIENT_STATUSES: [u16; 3] = [429, 500, 503];

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("auth error: {0}")]
    Auth(String),
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("batch error: {0}")]
    Batch(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl AppError {
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Rate limits and server-unavailable responses are worth retrying.
    pub fn is_transient(&self) -> bool {
        self.status()
            .is_some_and(|status| TRANSIENT_STATUSES.contains(&status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_and_server_errors_are_transient() {
        for status in [429, 500, 503] {
            let error = AppError::Api {
                status,
                message: "busy".to_string(),
            };
            assert!(error.is_transient(), "{status} should be transient");
        }
    }

    #[test]
    fn client_errors_are_not_transient() {
        let not_found = AppError::Api {
            status: 404,
            message: "gone".to_string(),
        };
        assert!(!not_found.is_transient());
        assert!(!AppError::Auth("expired".to_string()).is_transient());
        assert!(!AppError::Config("missing".to_string()).is_transient());
    }
}
