use std::fmt;

use clap::ValueEnum;
use serde::Serialize;

/// Permission grant a session is authorized for. Each scope keeps its own
/// token file so a read-only login never shadows a modify login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[value(name = "readonly")]
    ReadOnly,
    Modify,
}

impl Scope {
    pub fn url(self) -> &'static str {
        match self {
            Scope::ReadOnly => "https://www.googleapis.com/auth/gmail.readonly",
            Scope::Modify => "https://www.googleapis.com/auth/gmail.modify",
        }
    }

    pub fn file_stem(self) -> &'static str {
        match self {
            Scope::ReadOnly => "readonly",
            Scope::Modify => "modify",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}
