pub mod credentials;
pub mod paths;
pub mod policy;

pub use credentials::{ClientConfig, CredentialSource, DEFAULT_CREDENTIALS_PATH};
pub use paths::TokenPaths;
pub use policy::{FetchPolicy, RetryPolicy};
