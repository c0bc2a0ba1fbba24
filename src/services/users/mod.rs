//! Users service for the Graph API.
//!
//! Directory lookups plus the email-to-id cache used when opening chats.

mod cache;
mod service;

pub use cache::PrincipalCache;
pub use service::*;
