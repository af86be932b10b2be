use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use tracing::debug;

use crate::config::TokenPaths;
use crate::error::{AppError, AppResult};

use super::{Scope, TokenSet};

/// Persisted OAuth tokens, one slot per permission scope. A read-only token
/// never satisfies a modify request or the other way round.
pub trait TokenStore {
    fn load(&self, scope: Scope) -> AppResult<Option<TokenSet>>;
    fn save(&self, scope: Scope, token: &TokenSet) -> AppResult<()>;
    fn clear(&self, scope: Scope) -> AppResult<()>;
}

/// `token.<scope>.json` files, readable only by the owner.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    paths: TokenPaths,
}

impl FileTokenStore {
    pub fn new(paths: TokenPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &TokenPaths {
        &self.paths
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self, scope: Scope) -> AppResult<Option<TokenSet>> {
        let path = self.paths.token_file(scope);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        serde_json::from_str(&raw).map(Some).map_err(|err| {
            AppError::Config(format!(
                "stored {scope} token at {} is unreadable ({err}); delete it to re-authorize",
                path.display()
            ))
        })
    }

    fn save(&self, scope: Scope, token: &TokenSet) -> AppResult<()> {
        let path = self.paths.token_file(scope);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = owner_only(&path)?;
        serde_json::to_writer_pretty(&mut file, token)?;
        file.flush()?;
        debug!(%scope, path = %path.display(), "token saved");
        Ok(())
    }

    fn clear(&self, scope: Scope) -> AppResult<()> {
        match fs::remove_file(self.paths.token_file(scope)) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

/// Opens `path` for writing, truncated, with 0600 permissions applied before
/// any token bytes land in it.
fn owner_only(path: &Path) -> AppResult<fs::File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

        options.mode(0o600);
        let file = options.open(path)?;
        // Pre-existing files keep their old mode through `open`.
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
        Ok(file)
    }

    #[cfg(not(unix))]
    {
        Ok(options.open(path)?)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn token(access_token: &str) -> TokenSet {
        TokenSet {
            access_token: access_token.to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at_unix: Some(1_700_000_000),
            token_type: Some("Bearer".to_string()),
            scope: None,
            client_id: None,
            client_secret: None,
            token_uri: None,
        }
    }

    fn store() -> (FileTokenStore, TempDir) {
        let dir = TempDir::new().expect("tempdir");
        (FileTokenStore::new(TokenPaths::in_dir(dir.path())), dir)
    }

    #[test]
    fn missing_file_is_no_token() {
        let (store, _dir) = store();
        assert!(store.load(Scope::Modify).expect("load").is_none());
    }

    #[test]
    fn save_overwrites_and_clear_is_idempotent() {
        let (store, _dir) = store();
        store.save(Scope::ReadOnly, &token("first")).expect("save");
        store.save(Scope::ReadOnly, &token("second")).expect("save");

        let loaded = store.load(Scope::ReadOnly).expect("load").expect("token");
        assert_eq!(loaded.access_token, "second");

        store.clear(Scope::ReadOnly).expect("clear");
        store.clear(Scope::ReadOnly).expect("clear again");
        assert!(store.load(Scope::ReadOnly).expect("load").is_none());
    }

    #[test]
    fn corrupt_token_is_a_config_error() {
        let (store, _dir) = store();
        fs::write(store.paths().token_file(Scope::Modify), "{not json").expect("write");

        let result = store.load(Scope::Modify);
        match result {
            Err(AppError::Config(message)) => assert!(message.contains("token.modify.json")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn token_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (store, _dir) = store();
        let path = store.paths().token_file(Scope::ReadOnly);
        fs::write(&path, "{}").expect("pre-existing file");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).expect("chmod");

        store.save(Scope::ReadOnly, &token("secret")).expect("save");
        let mode = fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
