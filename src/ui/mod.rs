//! Terminal user interface for parley.

pub mod chat;
pub mod error;

pub use chat::{ChatCommand, ChatTui};
pub use error::ErrorScreen;
