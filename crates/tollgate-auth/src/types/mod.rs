//! Domain types owned by the persistence layer and read by the grant engine.
//!
//! - [`Client`] - registered OAuth 2.0 application
//! - [`AuthorizationCode`] - single-use credential issued at the authorize step
//! - [`AccessToken`] - issued access or refresh token

pub mod access_token;
pub mod authorization_code;
pub mod client;

pub use access_token::{AccessToken, TokenType};
pub use authorization_code::AuthorizationCode;
pub use client::Client;
