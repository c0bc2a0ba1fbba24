//! Teams and channels service for the Graph API.

mod service;

pub use service::*;
