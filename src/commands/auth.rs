use crate::auth::{AuthService, AuthStatus, FileTokenStore};
use crate::cli::AuthCommand;
use crate::config::CredentialSource;
use crate::error::AppResult;
use crate::output::Output;

pub async fn run(command: AuthCommand, output: &Output, store: &FileTokenStore) -> AppResult<()> {
    match command {
        AuthCommand::Login(args) => {
            let scope = args.scope.scope;
            let credentials = CredentialSource::parse(&args.credentials.creds)?;
            AuthService::authorize(scope, &credentials, store).await?;

            let status = AuthService::status(scope, store).await?;
            output.emit(&format!("{scope}: logged in"), &status)
        }
        AuthCommand::Status(args) => {
            let status = AuthService::status(args.scope, store).await?;
            output.emit(&describe_status(&status), &status)
        }
        AuthCommand::Logout(args) => {
            let status = AuthService::logout(args.scope, store).await?;
            let note = status.note.as_deref().unwrap_or("logged out");
            output.emit(&format!("{}: {note}", status.scope), &status)
        }
    }
}

fn describe_status(status: &AuthStatus) -> String {
    if !status.logged_in {
        return format!("{}: logged out", status.scope);
    }

    let expiry = match (status.expired, status.expires_in_seconds) {
        (Some(true), _) => " (expired)".to_string(),
        (_, Some(seconds)) => format!(" (expires in {seconds}s)"),
        _ => String::new(),
    };
    let refresh_hint = match status.has_refresh_token {
        Some(true) => ", refresh available",
        Some(false) => ", no refresh token",
        None => "",
    };

    format!("{}: logged in{expiry}{refresh_hint}", status.scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Scope;

    fn status(logged_in: bool, expired: Option<bool>, refresh: Option<bool>) -> AuthStatus {
        AuthStatus {
            scope: Scope::Modify,
            logged_in,
            expired,
            expires_in_seconds: Some(120),
            has_refresh_token: refresh,
            note: None,
        }
    }

    #[test]
    fn describes_logged_out() {
        assert_eq!(describe_status(&status(false, None, None)), "modify: logged out");
    }

    #[test]
    fn describes_expiry_and_refresh() {
        assert_eq!(
            describe_status(&status(true, Some(false), Some(true))),
            "modify: logged in (expires in 120s), refresh available"
        );
        assert_eq!(
            describe_status(&status(true, Some(true), Some(false))),
            "modify: logged in (expired), no refresh token"
        );
    }
}
