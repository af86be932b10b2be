use std::io;
use std::process::Command;

use tracing::debug;

use crate::error::{AppError, AppResult};

const ONEPASSWORD_CLI: &str = "op";

pub fn is_supported_scheme(scheme: &str) -> bool {
    scheme == "op"
}

/// Resolves an `op://` reference through the 1Password CLI.
pub fn read_secret(reference: &str) -> AppResult<String> {
    debug!(reference, "reading secret via {ONEPASSWORD_CLI}");

    let output = Command::new(ONEPASSWORD_CLI)
        .args(["read", "--no-color", reference])
        .output()
        .map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => AppError::Config(
                "1Password CLI (`op`) not found. is it installed and on PATH?".to_string(),
            ),
            _ => AppError::Config(format!("failed to run 1Password CLI: {err}")),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AppError::Config(format!(
            "error fetching secret `{reference}` from 1Password: {}",
            stderr.trim()
        )));
    }

    let secret = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if secret.is_empty() {
        return Err(AppError::Config(format!(
            "1Password returned an empty value for `{reference}`"
        )));
    }

    Ok(secret)
}
