//! Token Management

pub mod storage;

pub use storage::{FileTokenStore, InMemoryTokenStore, MockTokenStore, TokenStore};
