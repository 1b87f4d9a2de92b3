#![forbid(clippy::unwrap_used)]
#![forbid(unsafe_code)]
#![forbid(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod config;
pub mod entities;
pub mod http;
pub mod services;
pub mod utils;
