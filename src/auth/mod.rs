pub mod callback;
pub mod oauth;
pub mod scope;
pub mod secrets;
pub mod token;
pub mod token_store;

pub use oauth::{AuthService, AuthStatus};
pub use scope::Scope;
pub use token::TokenSet;
pub use token_store::{FileTokenStore, TokenStore};
