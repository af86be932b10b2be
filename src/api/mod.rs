pub mod batch;
pub mod client;
pub mod labels;
pub mod messages;
pub mod models;

pub use client::GmailClient;
