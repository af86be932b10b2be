use serde::Serialize;

use crate::auth::{FileTokenStore, Scope};
use crate::cli::{Cli, Command};
use crate::commands;
use crate::config::TokenPaths;
use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::output::Output;

#[derive(Debug, Serialize)]
pub struct SetupAborted {
    pub aborted: bool,
    pub reason: String,
}

pub async fn run(cli: Cli, output: Output) -> AppResult<()> {
    match cli.command {
        Command::Auth(args) => {
            let store = FileTokenStore::new(TokenPaths::working_dir());
            let result = commands::auth::run(args.command, &output, &store).await;
            abort_on_setup_failure(&output, result).map(|_| ())
        }
        Command::Senders(args) => {
            output.lines(["--- Gmail Sender Counter ---"])?;
            let Some(ctx) = connect(&args.credentials.creds, Scope::ReadOnly, &output).await? else {
                return Ok(());
            };
            commands::senders::run(&ctx, args).await
        }
        Command::Analyze(args) => {
            output.lines(["--- Gmail Analyzer ---"])?;
            let Some(ctx) = connect(&args.credentials.creds, Scope::Modify, &output).await? else {
                return Ok(());
            };
            commands::analyze::run(&ctx, args).await
        }
        Command::Archive(args) => {
            output.lines(["--- Gmail Archiver ---"])?;
            let Some(ctx) = connect(&args.credentials.creds, Scope::ReadOnly, &output).await? else {
                return Ok(());
            };
            commands::archive::run(&ctx, args).await
        }
    }
}

async fn connect(creds: &str, scope: Scope, output: &Output) -> AppResult<Option<AppContext>> {
    let result = AppContext::bootstrap(creds, scope, output.clone()).await;
    abort_on_setup_failure(output, result)
}

/// Credential and authorization failures end the run with a message rather
/// than an error exit. Everything else is passed through.
pub fn abort_on_setup_failure<T>(output: &Output, result: AppResult<T>) -> AppResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err @ (AppError::Config(_) | AppError::Auth(_))) => {
            let report = SetupAborted {
                aborted: true,
                reason: err.to_string(),
            };
            output.emit(&format!("Could not authenticate: {err}. Aborting."), &report)?;
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_failures_become_a_clean_abort() {
        let output = Output::quiet();
        for err in [
            AppError::Config("credentials not found".to_string()),
            AppError::Auth("oauth state did not match".to_string()),
        ] {
            let outcome = abort_on_setup_failure::<()>(&output, Err(err)).expect("graceful");
            assert!(outcome.is_none());
        }
    }

    #[test]
    fn other_failures_still_propagate() {
        let result = abort_on_setup_failure::<()>(
            &Output::quiet(),
            Err(AppError::Api {
                status: 500,
                message: "backend error".to_string(),
            }),
        );
        assert!(matches!(result, Err(AppError::Api { status: 500, .. })));
    }
}
