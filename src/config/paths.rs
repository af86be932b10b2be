use std::path::{Path, PathBuf};

use crate::auth::Scope;

/// Token files live next to the invocation, one per permission scope.
#[derive(Debug, Clone)]
pub struct TokenPaths {
    dir: PathBuf,
}

impl TokenPaths {
    pub fn working_dir() -> Self {
        Self::in_dir(".")
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn token_file(&self, scope: Scope) -> PathBuf {
        self.dir.join(format!("token.{}.json", scope.file_stem()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_file_is_named_after_scope() {
        let paths = TokenPaths::in_dir("/tmp/tidy");
        assert_eq!(
            paths.token_file(Scope::ReadOnly),
            PathBuf::from("/tmp/tidy/token.readonly.json")
        );
        assert_eq!(
            paths.token_file(Scope::Modify),
            PathBuf::from("/tmp/tidy/token.modify.json")
        );
    }
}
