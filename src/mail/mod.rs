pub mod address;
pub mod body;

pub use address::{extract_address, extract_domain, sender_key};
pub use body::{html_to_text, message_body};
