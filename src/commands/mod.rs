pub mod analyze;
pub mod archive;
pub mod auth;
pub mod senders;
