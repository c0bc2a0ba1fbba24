//! Types
//!
//! Token, device-flow and Graph record types.

pub mod device;
pub mod graph;
pub mod token;

pub use device::*;
pub use graph::*;
pub use token::*;
