#![forbid(clippy::unwrap_used)]
#![forbid(unsafe_code)]
#![forbid(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod api;
pub mod cart;
pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod render;
pub mod session;
pub mod telegram;
pub mod updates;

pub use error::BotError;
