//! Service implementations for Graph endpoints.
//!
//! Each service wraps one area of the API on top of the `ApiRequester`
//! contract and propagates its errors unchanged.

pub mod chats;
pub mod teams;
pub mod users;

pub use chats::{ChatsService, ChatsServiceTrait};
pub use teams::{TeamsService, TeamsServiceTrait};
pub use users::{PrincipalCache, UsersService, UsersServiceTrait};
