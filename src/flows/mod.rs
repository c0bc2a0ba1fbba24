//! Authentication Flows

pub mod device;

pub use device::{DeviceCodeAuthenticator, TokenRefresher};
